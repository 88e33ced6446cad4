use super::{
    color_space::{BrushDescriptor, ColorSpace},
    path::PathGeometry,
    trans::{
        page_to_device, DevicePoint, PageRect, PageToDeviceSpace, UserPoint, UserToDeviceSpace,
        UserToPageSpace, UserToUserSpace, UserVector,
    },
    LineCapStyle, LineJoinStyle,
};
use crate::{operand::Operand, stack::Stack, MachineError, MachineResult};
use euclid::Transform2D;
use std::rc::Rc;

/// Drawing attributes saved by `gsave` and `save`.
///
/// Cloning gives an independent state, color space and brush descriptors
/// are immutable and shared.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    ctm: UserToPageSpace,
    flip: PageToDeviceSpace,
    user_to_device: UserToDeviceSpace,
    color_space: Rc<ColorSpace>,
    color: Vec<Operand>,
    fill: Rc<BrushDescriptor>,
    stroke: Rc<BrushDescriptor>,
    line_width: f64,
    line_cap: LineCapStyle,
    line_join: LineJoinStyle,
    miter_limit: f64,
    dash: Vec<f64>,
    dash_offset: f64,
    flatness: f64,
    stroke_adjust: bool,
    overprint: bool,
    opacity: f64,
    clip: Vec<Rc<PathGeometry>>,
    path: PathGeometry,
    current_point: Option<DevicePoint>,
    font: Option<Operand>,
}

impl GraphicsState {
    /// Initial state: identity CTM, DeviceGray black.
    pub fn new(page: &PageRect) -> Self {
        let flip = page_to_device(page);
        let black = Rc::new(BrushDescriptor::gray(0.0));
        Self {
            ctm: Transform2D::identity(),
            flip,
            user_to_device: Transform2D::identity().then(&flip),
            color_space: Rc::new(ColorSpace::DeviceGray),
            color: vec![0.into()],
            fill: black.clone(),
            stroke: black,
            line_width: 1.0,
            line_cap: LineCapStyle::default(),
            line_join: LineJoinStyle::default(),
            miter_limit: 10.0,
            dash: vec![],
            dash_offset: 0.0,
            flatness: 1.0,
            stroke_adjust: false,
            overprint: false,
            opacity: 1.0,
            clip: vec![],
            path: PathGeometry::new(),
            current_point: None,
            font: None,
        }
    }

    fn update_user_to_device(&mut self) {
        self.user_to_device = self.ctm.then(&self.flip);
    }

    pub fn ctm(&self) -> &UserToPageSpace {
        &self.ctm
    }

    pub fn user_to_device(&self) -> &UserToDeviceSpace {
        &self.user_to_device
    }

    pub fn page_to_device(&self) -> &PageToDeviceSpace {
        &self.flip
    }

    pub fn set_ctm(&mut self, ctm: UserToPageSpace) {
        self.ctm = ctm;
        self.update_user_to_device();
    }

    /// Apply `m` before current CTM, as `concat` does.
    pub fn concat_ctm(&mut self, m: &UserToUserSpace) {
        self.ctm = m.then(&self.ctm);
        self.update_user_to_device();
    }

    pub fn to_device(&self, p: UserPoint) -> DevicePoint {
        self.user_to_device.transform_point(p)
    }

    /// Map device point back to user space, fails if CTM is singular.
    pub fn to_user(&self, p: DevicePoint) -> MachineResult<UserPoint> {
        self.user_to_device
            .inverse()
            .map(|t| t.transform_point(p))
            .ok_or(MachineError::UndefinedResult)
    }

    pub fn user_vector_to_device(&self, v: UserVector) -> euclid::Vector2D<f64, super::trans::DeviceSpace> {
        self.user_to_device.transform_vector(v)
    }

    /// Scale of user space units in device space, used for line widths.
    pub fn device_scale(&self) -> f64 {
        self.user_to_device.determinant().abs().sqrt()
    }

    pub fn color_space(&self) -> &Rc<ColorSpace> {
        &self.color_space
    }

    /// Components of the current color as given to `setcolor`.
    pub fn color(&self) -> &[Operand] {
        &self.color
    }

    /// Set color space and the resolved brush of its initial color.
    pub fn set_color_space(&mut self, space: Rc<ColorSpace>, color: Vec<Operand>, brush: BrushDescriptor) {
        self.color_space = space;
        self.set_color(color, brush);
    }

    /// PostScript has one current color, used for both fill and stroke.
    pub fn set_color(&mut self, color: Vec<Operand>, brush: BrushDescriptor) {
        self.color = color;
        let brush = Rc::new(brush);
        self.fill = brush.clone();
        self.stroke = brush;
    }

    pub fn fill(&self) -> &Rc<BrushDescriptor> {
        &self.fill
    }

    pub fn stroke(&self) -> &Rc<BrushDescriptor> {
        &self.stroke
    }

    pub fn line_width(&self) -> f64 {
        self.line_width
    }

    pub fn set_line_width(&mut self, w: f64) {
        self.line_width = w;
    }

    pub fn line_cap(&self) -> LineCapStyle {
        self.line_cap
    }

    pub fn set_line_cap(&mut self, cap: LineCapStyle) {
        self.line_cap = cap;
    }

    pub fn line_join(&self) -> LineJoinStyle {
        self.line_join
    }

    pub fn set_line_join(&mut self, join: LineJoinStyle) {
        self.line_join = join;
    }

    pub fn miter_limit(&self) -> f64 {
        self.miter_limit
    }

    pub fn set_miter_limit(&mut self, limit: f64) {
        self.miter_limit = limit;
    }

    pub fn dash(&self) -> (&[f64], f64) {
        (&self.dash, self.dash_offset)
    }

    pub fn set_dash(&mut self, pattern: Vec<f64>, offset: f64) {
        self.dash = pattern;
        self.dash_offset = offset;
    }

    pub fn flatness(&self) -> f64 {
        self.flatness
    }

    pub fn set_flatness(&mut self, v: f64) {
        self.flatness = v;
    }

    pub fn stroke_adjust(&self) -> bool {
        self.stroke_adjust
    }

    pub fn set_stroke_adjust(&mut self, v: bool) {
        self.stroke_adjust = v;
    }

    pub fn overprint(&self) -> bool {
        self.overprint
    }

    pub fn set_overprint(&mut self, v: bool) {
        self.overprint = v;
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn set_opacity(&mut self, v: f64) {
        self.opacity = v.clamp(0.0, 1.0);
    }

    /// Clip chain, each path intersects the ones before it.
    pub fn clip(&self) -> &[Rc<PathGeometry>] {
        &self.clip
    }

    pub fn push_clip(&mut self, path: PathGeometry) {
        self.clip.push(Rc::new(path));
    }

    pub fn init_clip(&mut self) {
        self.clip.clear();
    }

    pub fn path(&self) -> &PathGeometry {
        &self.path
    }

    pub fn path_mut(&mut self) -> &mut PathGeometry {
        &mut self.path
    }

    /// Take current path and start a new empty one.
    pub fn take_path(&mut self) -> PathGeometry {
        self.current_point = None;
        std::mem::take(&mut self.path)
    }

    pub fn current_point(&self) -> Option<DevicePoint> {
        self.current_point
    }

    pub fn require_current_point(&self) -> MachineResult<DevicePoint> {
        self.current_point.ok_or(MachineError::NoCurrentPoint)
    }

    pub fn set_current_point(&mut self, p: Option<DevicePoint>) {
        self.current_point = p;
    }

    pub fn font(&self) -> Option<&Operand> {
        self.font.as_ref()
    }

    pub fn set_font(&mut self, font: Operand) {
        self.font = Some(font);
    }
}

#[derive(Debug, Clone)]
struct SavedState {
    state: GraphicsState,
    /// Set if saved by `save`, the save level.
    save_level: Option<i32>,
}

/// Current graphics state plus states saved by `gsave` and `save`.
#[derive(Debug)]
pub struct GraphicsStateStack {
    current: GraphicsState,
    saved: Stack<SavedState>,
}

impl GraphicsStateStack {
    pub fn new(initial: GraphicsState) -> Self {
        Self {
            current: initial,
            saved: Stack::with_underflow(MachineError::GraphicsStackUnderflow),
        }
    }

    pub fn current(&self) -> &GraphicsState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut GraphicsState {
        &mut self.current
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Save a copy of current state.
    pub fn push(&mut self) {
        self.saved.push(SavedState {
            state: self.current.clone(),
            save_level: None,
        });
    }

    /// Replace current state with the last saved one. Popping an empty
    /// stack is a fatal error.
    pub fn pop(&mut self) -> MachineResult<()> {
        let saved = self.saved.top()?;
        if saved.save_level.is_some() {
            // `grestore` does not pop states saved by `save`
            self.current = saved.state.clone();
        } else {
            self.current = self.saved.pop()?.state;
        }
        Ok(())
    }

    /// Pop states saved by `gsave` down to the last `save`, or to the
    /// bottom.
    pub fn pop_all(&mut self) {
        while let Ok(saved) = self.saved.top() {
            if saved.save_level.is_some() {
                self.current = saved.state.clone();
                return;
            }
            if let Ok(saved) = self.saved.pop() {
                self.current = saved.state;
            }
        }
    }

    pub fn push_save(&mut self, level: i32) {
        self.saved.push(SavedState {
            state: self.current.clone(),
            save_level: Some(level),
        });
    }

    /// Unwind to the state saved by `save` of `level`.
    pub fn restore(&mut self, level: i32) -> MachineResult<()> {
        if !self.saved.iter().any(|s| s.save_level == Some(level)) {
            return Err(MachineError::InvalidRestore);
        }
        loop {
            let saved = self.saved.pop()?;
            if saved.save_level == Some(level) {
                self.current = saved.state;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests;
