//! Resolves shading dictionaries to gradient brushes.

use super::{
    color_space::{ColorPrecision, ColorSpace, Rgb},
    node::{Brush, GradientStop},
    trans::{DeviceRect, UserPoint, UserToDeviceSpace},
};
use crate::{
    function::{function_from_operand, Function},
    machine::Machine,
    operand::{DictRef, Operand},
    MachineError, MachineResult,
};
use log::debug;

/// Stops sampled from functions not known to be linear.
const SAMPLED_STOPS: usize = 32;

/// Turns shading dictionary into brush. `to_device` maps shading space to
/// device space, `bounds` is the device region to paint.
pub trait ShadingManager {
    fn resolve(
        &self,
        m: &mut Machine,
        shading: &DictRef,
        to_device: &UserToDeviceSpace,
        bounds: &DeviceRect,
    ) -> MachineResult<(Brush, ColorPrecision)>;
}

/// Supports axial and radial shadings, other types are painted with the
/// placeholder color.
#[derive(Debug, Default)]
pub struct DefaultShadingManager;

/// Shading `Function` entry: one function, or one function per color
/// component.
enum ShadingFunction {
    Single(Box<dyn Function>),
    PerComponent(Vec<Box<dyn Function>>),
}

impl ShadingFunction {
    fn from_operand(v: &Operand) -> MachineResult<Self> {
        if v.opt_dict_value().is_some() {
            return function_from_operand(v).map(Self::Single);
        }
        let functions = v
            .array_like()?
            .borrow()
            .iter()
            .map(function_from_operand)
            .collect::<MachineResult<Vec<_>>>()?;
        Ok(Self::PerComponent(functions))
    }

    fn call(&self, t: f64) -> MachineResult<Vec<f64>> {
        match self {
            Self::Single(f) => f.call(&[t]),
            Self::PerComponent(fs) => fs
                .iter()
                .map(|f| {
                    f.call(&[t])?
                        .first()
                        .copied()
                        .ok_or(MachineError::RangeCheck)
                })
                .collect(),
        }
    }

    fn is_linear(&self) -> bool {
        match self {
            Self::Single(f) => f.is_linear(),
            Self::PerComponent(fs) => fs.iter().all(|f| f.is_linear()),
        }
    }
}

fn gradient_stops(
    m: &mut Machine,
    space: &ColorSpace,
    function: &ShadingFunction,
    domain: (f64, f64),
) -> MachineResult<(Vec<GradientStop>, ColorPrecision)> {
    let (n, precision) = if function.is_linear() {
        (1, ColorPrecision::Precise)
    } else {
        (SAMPLED_STOPS, ColorPrecision::Estimated)
    };
    let mut stops = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let offset = i as f64 / n as f64;
        let t = offset.mul_add(domain.1 - domain.0, domain.0);
        let components = function.call(t)?;
        stops.push(GradientStop {
            offset,
            color: space.get_color(m, &components)?,
        });
    }
    Ok((stops, precision.worst(space.precision())))
}

impl ShadingManager for DefaultShadingManager {
    fn resolve(
        &self,
        m: &mut Machine,
        shading: &DictRef,
        to_device: &UserToDeviceSpace,
        _bounds: &DeviceRect,
    ) -> MachineResult<(Brush, ColorPrecision)> {
        let d = shading.borrow();
        let shading_type = d.find_by_name("ShadingType")?.int()?;
        if !matches!(shading_type, 2 | 3) {
            debug!("shading type {shading_type} painted as placeholder");
            return Ok((Brush::Solid(Rgb::PLACEHOLDER), ColorPrecision::Placeholder));
        }
        let space = d.find_by_name("ColorSpace")?.clone();
        let coords = d.find_by_name("Coords")?.numbers()?;
        let function = ShadingFunction::from_operand(d.find_by_name("Function")?)?;
        let domain = match d.get_by_name("Domain").map(Operand::numbers).transpose()? {
            Some(v) if v.len() == 2 => (v[0], v[1]),
            _ => (0.0, 1.0),
        };
        let extend = match d.get_by_name("Extend") {
            Some(v) => {
                let v = v.array_like()?;
                let v = v.borrow();
                match v.as_slice() {
                    [a, b] => [a.bool()?, b.bool()?],
                    _ => return Err(MachineError::RangeCheck),
                }
            }
            None => [false, false],
        };
        drop(d);

        let space = ColorSpace::from_operand(m, &space)?;
        let (stops, precision) = gradient_stops(m, &space, &function, domain)?;
        let point = |x: f64, y: f64| to_device.transform_point(UserPoint::new(x, y));
        let brush = match (shading_type, coords.as_slice()) {
            (2, &[x0, y0, x1, y1]) => Brush::LinearGradient {
                start: point(x0, y0),
                end: point(x1, y1),
                stops,
                extend,
            },
            (3, &[x0, y0, r0, x1, y1, r1]) => {
                // radius scaled by the mean scale of the transform
                let scale = to_device.determinant().abs().sqrt();
                Brush::RadialGradient {
                    start_center: point(x0, y0),
                    start_radius: r0 * scale,
                    end_center: point(x1, y1),
                    end_radius: r1 * scale,
                    stops,
                    extend,
                }
            }
            _ => return Err(MachineError::RangeCheck),
        };
        Ok((brush, precision))
    }
}

#[cfg(test)]
mod tests;
