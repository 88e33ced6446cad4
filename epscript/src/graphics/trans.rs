//! Coordinate spaces. User space is mapped by the CTM to page space, the
//! default PostScript coordinates with y axis up. A fixed flip derived from
//! the page box maps page space to device space, origin at top left.

use euclid::{Box2D, Point2D, Transform2D, Vector2D};

pub enum UserSpace {}
pub enum PageSpace {}
pub enum DeviceSpace {}
pub enum PatternSpace {}
pub enum FormSpace {}

pub type UserToPageSpace = Transform2D<f64, UserSpace, PageSpace>;
pub type UserToUserSpace = Transform2D<f64, UserSpace, UserSpace>;
pub type PageToDeviceSpace = Transform2D<f64, PageSpace, DeviceSpace>;
pub type UserToDeviceSpace = Transform2D<f64, UserSpace, DeviceSpace>;
pub type PatternToPageSpace = Transform2D<f64, PatternSpace, PageSpace>;
pub type PatternToDeviceSpace = Transform2D<f64, PatternSpace, DeviceSpace>;
pub type FormToUserSpace = Transform2D<f64, FormSpace, UserSpace>;

pub type UserPoint = Point2D<f64, UserSpace>;
pub type DevicePoint = Point2D<f64, DeviceSpace>;
pub type UserVector = Vector2D<f64, UserSpace>;
pub type PageRect = Box2D<f64, PageSpace>;
pub type DeviceRect = Box2D<f64, DeviceSpace>;

/// Flip y axis so that the top of `page` lands at device y = 0 and its left
/// edge at device x = 0.
pub fn page_to_device(page: &PageRect) -> PageToDeviceSpace {
    Transform2D::scale(1.0, -1.0).then_translate((-page.min.x, page.max.y).into())
}

/// Treat a transform as one between other spaces, the numbers are kept.
pub fn retype<S1, D1, S2, D2>(m: &Transform2D<f64, S1, D1>) -> Transform2D<f64, S2, D2> {
    Transform2D::new(m.m11, m.m12, m.m21, m.m22, m.m31, m.m32)
}
