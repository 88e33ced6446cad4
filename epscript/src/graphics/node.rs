//! Graphic tree handed to code generators.

use super::{
    color_space::{ColorPrecision, Rgb},
    path::PathGeometry,
    trans::{DevicePoint, DeviceRect, PatternSpace, PatternToDeviceSpace},
    LineCapStyle, LineJoinStyle,
};
use euclid::Box2D;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Rgb,
}

/// Materialized paint.
#[derive(Debug, Clone, PartialEq)]
pub enum Brush {
    Solid(Rgb),
    LinearGradient {
        start: DevicePoint,
        end: DevicePoint,
        stops: Vec<GradientStop>,
        /// Extend before start and after end.
        extend: [bool; 2],
    },
    RadialGradient {
        start_center: DevicePoint,
        start_radius: f64,
        end_center: DevicePoint,
        end_radius: f64,
        stops: Vec<GradientStop>,
        extend: [bool; 2],
    },
    /// Tiling pattern, `content` is drawn in pattern space, one cell
    /// every `step`.
    Tile {
        content: Rc<GraphicGroup>,
        cell: Box2D<f64, PatternSpace>,
        step: (f64, f64),
        transform: PatternToDeviceSpace,
        /// Device box of the painted region.
        viewport: DeviceRect,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub brush: Brush,
    /// Line width in device space.
    pub width: f64,
    pub cap: LineCapStyle,
    pub join: LineJoinStyle,
    pub miter_limit: f64,
    pub dash: Vec<f64>,
    pub dash_offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicPath {
    pub geometry: PathGeometry,
    pub fill: Option<Brush>,
    pub stroke: Option<StrokeStyle>,
    pub precision: ColorPrecision,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicGroup {
    pub clip: Option<Rc<PathGeometry>>,
    pub opacity: f64,
    pub children: Vec<GraphicNode>,
}

impl Default for GraphicGroup {
    fn default() -> Self {
        Self {
            clip: None,
            opacity: 1.0,
            children: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphicNode {
    Group(GraphicGroup),
    Path(GraphicPath),
}

impl GraphicGroup {
    /// Iterate all paths, depth first.
    pub fn paths(&self) -> Box<dyn Iterator<Item = &GraphicPath> + '_> {
        Box::new(self.children.iter().flat_map(|n| match n {
            GraphicNode::Path(p) => Box::new(std::iter::once(p)) as Box<dyn Iterator<Item = &GraphicPath> + '_>,
            GraphicNode::Group(g) => g.paths(),
        }))
    }

    /// Least precise color of all paths.
    pub fn precision(&self) -> ColorPrecision {
        self.paths()
            .map(|p| p.precision)
            .fold(ColorPrecision::Precise, ColorPrecision::worst)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Collects painted paths into nested groups that follow the clip chain.
///
/// Open groups mirror the clip chain of the last added path, a group is
/// closed once a path with a different chain comes.
#[derive(Debug, Default)]
pub struct GraphicTreeBuilder {
    /// `groups[0]` is the root, `groups[i]` clipped by `clips[i - 1]`.
    groups: Vec<GraphicGroup>,
    clips: Vec<Rc<PathGeometry>>,
}

impl GraphicTreeBuilder {
    pub fn new() -> Self {
        Self {
            groups: vec![GraphicGroup::default()],
            clips: vec![],
        }
    }

    fn close_group(&mut self) {
        if self.groups.len() > 1 {
            if let Some(g) = self.groups.pop() {
                self.clips.pop();
                self.current().children.push(GraphicNode::Group(g));
            }
        }
    }

    fn current(&mut self) -> &mut GraphicGroup {
        if self.groups.is_empty() {
            self.groups.push(GraphicGroup::default());
        }
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }

    /// Add path painted under clip chain `clip` with `opacity`.
    pub fn add(&mut self, path: GraphicPath, clip: &[Rc<PathGeometry>], opacity: f64) {
        let common = self
            .clips
            .iter()
            .zip(clip)
            .take_while(|(a, b)| Rc::ptr_eq(a, b))
            .count();
        while self.clips.len() > common {
            self.close_group();
        }
        for c in &clip[common..] {
            self.groups.push(GraphicGroup {
                clip: Some(c.clone()),
                ..Default::default()
            });
            self.clips.push(c.clone());
        }

        let node = GraphicNode::Path(path);
        let node = if opacity < 1.0 {
            GraphicNode::Group(GraphicGroup {
                clip: None,
                opacity: opacity.max(0.0),
                children: vec![node],
            })
        } else {
            node
        };
        self.current().children.push(node);
    }

    /// Close all groups and return the root.
    pub fn finish(mut self) -> GraphicGroup {
        while self.groups.len() > 1 {
            self.close_group();
        }
        self.groups.pop().unwrap_or_default()
    }
}
