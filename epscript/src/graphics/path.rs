use super::trans::{DevicePoint, DeviceRect, UserPoint, UserToDeviceSpace};
use std::f64::consts::{FRAC_PI_2, TAU as TURN};

/// Two turns of quarter circle curves.
const MAX_ARC_CURVES: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// Path segment in device space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(DevicePoint),
    LineTo(DevicePoint),
    CurveTo(DevicePoint, DevicePoint, DevicePoint),
    ClosePath,
}

/// Path built by path construction operators, coordinates are already in
/// device space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathGeometry {
    segments: Vec<PathSegment>,
    fill_rule: FillRule,
}

impl PathGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closed rectangle from two corners.
    pub fn rect(rect: &DeviceRect) -> Self {
        let mut r = Self::new();
        r.move_to(rect.min);
        r.line_to((rect.max.x, rect.min.y).into());
        r.line_to(rect.max);
        r.line_to((rect.min.x, rect.max.y).into());
        r.close();
        r
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    pub fn with_fill_rule(mut self, rule: FillRule) -> Self {
        self.fill_rule = rule;
        self
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Consecutive `moveto` replaces the previous one.
    pub fn move_to(&mut self, p: DevicePoint) {
        if let Some(PathSegment::MoveTo(last)) = self.segments.last_mut() {
            *last = p;
        } else {
            self.segments.push(PathSegment::MoveTo(p));
        }
    }

    pub fn line_to(&mut self, p: DevicePoint) {
        self.segments.push(PathSegment::LineTo(p));
    }

    pub fn curve_to(&mut self, p1: DevicePoint, p2: DevicePoint, p3: DevicePoint) {
        self.segments.push(PathSegment::CurveTo(p1, p2, p3));
    }

    pub fn close(&mut self) {
        if !matches!(
            self.segments.last(),
            None | Some(PathSegment::ClosePath)
        ) {
            self.segments.push(PathSegment::ClosePath);
        }
    }

    /// Start point of the last sub path, current point after `closepath`.
    pub fn last_move_to(&self) -> Option<DevicePoint> {
        self.segments.iter().rev().find_map(|s| match s {
            PathSegment::MoveTo(p) => Some(*p),
            _ => None,
        })
    }

    /// Bounding box of all points, control points included.
    pub fn bounds(&self) -> Option<DeviceRect> {
        let points = self.segments.iter().flat_map(|s| match *s {
            PathSegment::MoveTo(p) | PathSegment::LineTo(p) => vec![p],
            PathSegment::CurveTo(p1, p2, p3) => vec![p1, p2, p3],
            PathSegment::ClosePath => vec![],
        });
        let mut r: Option<DeviceRect> = None;
        for p in points {
            r = Some(match r {
                None => DeviceRect::new(p, p),
                Some(b) => DeviceRect::new(b.min.min(p), b.max.max(p)),
            });
        }
        r
    }
}

/// Arc of circle in user space, approximated by cubic beziers of at most a
/// quarter circle each. Angles in degrees. Returned curves are transformed
/// to device space, first item is the start point of the arc.
pub fn arc_to_curves(
    center: UserPoint,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    clockwise: bool,
    to_device: &UserToDeviceSpace,
) -> (DevicePoint, Vec<[DevicePoint; 3]>) {
    let mut a1 = start_angle.to_radians();
    let mut sweep = end_angle.to_radians() - a1;
    // end angle moves by whole turns until it lies on the drawing side of
    // the start angle
    if clockwise && sweep > 0.0 {
        sweep = -(-sweep).rem_euclid(TURN);
    } else if !clockwise && sweep < 0.0 {
        sweep = sweep.rem_euclid(TURN);
    }
    // more than one turn retraces the circle, keep one turn plus the rest
    if sweep.abs() > TURN {
        sweep = sweep.signum() * (TURN + sweep.abs().rem_euclid(TURN));
    }

    let point = |a: f64| UserPoint::new(radius.mul_add(a.cos(), center.x), radius.mul_add(a.sin(), center.y));
    let start = to_device.transform_point(point(a1));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = (sweep.abs() / FRAC_PI_2).ceil().clamp(0.0, MAX_ARC_CURVES) as usize;
    let mut curves = Vec::with_capacity(n);
    if n == 0 {
        return (start, curves);
    }
    let step = sweep / n as f64;
    // control point distance for a unit circle arc of `step`
    let k = 4.0 / 3.0 * (step / 4.0).tan();
    for _ in 0..n {
        let b = a1 + step;
        let (s1, c1) = a1.sin_cos();
        let (s2, c2) = b.sin_cos();
        let p1 = UserPoint::new(
            radius.mul_add(c1 - k * s1, center.x),
            radius.mul_add(s1 + k * c1, center.y),
        );
        let p2 = UserPoint::new(
            radius.mul_add(c2 + k * s2, center.x),
            radius.mul_add(s2 - k * c2, center.y),
        );
        curves.push([
            to_device.transform_point(p1),
            to_device.transform_point(p2),
            to_device.transform_point(point(b)),
        ]);
        a1 = b;
    }
    (start, curves)
}
