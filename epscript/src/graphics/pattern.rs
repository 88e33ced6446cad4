//! Pattern activation: turns a pattern dictionary created by `makepattern`
//! into a paint.

use super::{
    color_space::{BrushDescriptor, ColorPrecision, Rgb},
    node::{Brush, GraphicGroup},
    trans::{retype, DeviceRect, PatternSpace, PatternToDeviceSpace},
};
use crate::{
    machine::Machine,
    operand::{DictRef, Operand},
    MachineResult,
};
use euclid::Box2D;
use log::debug;
use std::rc::Rc;

/// Paint of an activated pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternBrush {
    Tile {
        /// Graphic of one cell, already in device space.
        content: Rc<GraphicGroup>,
        cell: Box2D<f64, PatternSpace>,
        step: (f64, f64),
        transform: PatternToDeviceSpace,
    },
    Shading(Brush),
}

impl PatternBrush {
    pub fn brush(&self, bounds: &DeviceRect) -> Brush {
        match self {
            Self::Tile {
                content,
                cell,
                step,
                transform,
            } => Brush::Tile {
                content: content.clone(),
                cell: *cell,
                step: *step,
                transform: *transform,
                viewport: *bounds,
            },
            Self::Shading(b) => b.clone(),
        }
    }
}

/// Evaluates pattern content. `transform` maps pattern space to device
/// space, `underlying` is the color of uncolored tiling patterns.
pub trait PatternActivator {
    fn activate(
        &self,
        m: &mut Machine,
        pattern: &DictRef,
        transform: &PatternToDeviceSpace,
        underlying: Option<&BrushDescriptor>,
    ) -> MachineResult<(PatternBrush, ColorPrecision)>;
}

/// Runs `PaintProc` of tiling patterns in a child machine, delegates
/// shading patterns to the shading manager of the machine.
#[derive(Debug, Default)]
pub struct DefaultPatternActivator;

impl DefaultPatternActivator {
    fn tiling(
        m: &mut Machine,
        pattern: &DictRef,
        transform: &PatternToDeviceSpace,
        underlying: Option<&BrushDescriptor>,
    ) -> MachineResult<(PatternBrush, ColorPrecision)> {
        let (paint_proc, cell, step, paint_type) = {
            let d = pattern.borrow();
            let bbox = d.find_by_name("BBox")?.numbers()?;
            let [x0, y0, x1, y1] = bbox[..] else {
                return Err(crate::MachineError::RangeCheck);
            };
            (
                d.find_by_name("PaintProc")?.clone(),
                Box2D::new((x0.min(x1), y0.min(y1)).into(), (x0.max(x1), y0.max(y1)).into()),
                (
                    d.find_by_name("XStep")?.real()?,
                    d.find_by_name("YStep")?.real()?,
                ),
                d.get_by_name("PaintType")
                    .map(Operand::int)
                    .transpose()?
                    .unwrap_or(1),
            )
        };

        let page_to_device = *m.graphics().current().page_to_device();
        let to_page = page_to_device
            .inverse()
            .map(|inv| transform.then(&inv))
            .ok_or(crate::MachineError::UndefinedResult)?;
        let mut child = m.child(retype(&to_page))?;
        if paint_type == 2 {
            if let Some(u) = underlying {
                child
                    .graphics_mut()
                    .current_mut()
                    .set_color(vec![], u.clone());
            }
        }
        child.push(Operand::dict(pattern.clone()));
        child.execute_object(paint_proc)?;
        let content = child.finish();
        let precision = content.precision();
        Ok((
            PatternBrush::Tile {
                content: Rc::new(content),
                cell,
                step,
                transform: *transform,
            },
            precision,
        ))
    }
}

impl PatternActivator for DefaultPatternActivator {
    fn activate(
        &self,
        m: &mut Machine,
        pattern: &DictRef,
        transform: &PatternToDeviceSpace,
        underlying: Option<&BrushDescriptor>,
    ) -> MachineResult<(PatternBrush, ColorPrecision)> {
        let pattern_type = pattern.borrow().find_by_name("PatternType")?.int()?;
        match pattern_type {
            1 => Self::tiling(m, pattern, transform, underlying),
            2 => {
                let shading = pattern.borrow().find_by_name("Shading")?.dict_value()?;
                let bounds = m.device_page_rect();
                let manager = m.shading_manager();
                let (brush, precision) =
                    manager.resolve(m, &shading, &retype(transform), &bounds)?;
                Ok((PatternBrush::Shading(brush), precision))
            }
            t => {
                debug!("unsupported pattern type: {t}");
                Ok((
                    PatternBrush::Shading(Brush::Solid(Rgb::PLACEHOLDER)),
                    ColorPrecision::Placeholder,
                ))
            }
        }
    }
}
