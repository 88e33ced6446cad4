//! Color spaces and brush descriptors.
//!
//! A [`ColorSpace`] turns the raw components given to `setcolor` into a
//! [`BrushDescriptor`]. Separation, DeviceN and Indexed spaces with a lookup
//! procedure re-enter the machine to run their tint transform.

use super::{node::Brush, pattern::PatternBrush, trans::DeviceRect};
use crate::{
    machine::Machine,
    operand::{Operand, Value},
    MachineError, MachineResult, Name,
};
use log::{debug, error};
use std::rc::Rc;

/// How exact a resolved color is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ColorPrecision {
    #[default]
    Precise,
    /// Converted through an approximation, such as sampled gradients.
    Estimated,
    /// Color space not supported, a stand-in color is used.
    Placeholder,
}

impl ColorPrecision {
    /// The less precise one of the two.
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }
}

/// RGB color, channels in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    /// Stand-in color for unsupported spaces.
    pub const PLACEHOLDER: Self = Self::new(0.5, 0.5, 0.5);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(v: f64) -> Self {
        Self::new(v, v, v)
    }

    /// Each channel is `1 - min(1, c + k)`.
    pub fn from_cmyk(c: f64, m: f64, y: f64, k: f64) -> Self {
        let channel = |v: f64| 1.0 - (v + k).min(1.0);
        Self::new(channel(c), channel(m), channel(y))
    }

    pub fn to_gray(self) -> f64 {
        0.11f64.mul_add(self.b, 0.3f64.mul_add(self.r, 0.59 * self.g))
    }

    pub fn to_cmyk(self) -> [f64; 4] {
        let (c, m, y) = (1.0 - self.r, 1.0 - self.g, 1.0 - self.b);
        [c, m, y, c.min(m).min(y)]
    }

    /// 8 bit channels.
    pub fn to_bytes(self) -> [u8; 3] {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let f = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [f(self.r), f(self.g), f(self.b)]
    }
}

#[derive(Debug, Clone)]
enum DescriptorColor {
    Gray(f64),
    Rgb(Rgb),
    Cmyk([f64; 4]),
    Pattern {
        pattern: Rc<PatternBrush>,
        /// Color used where a solid color is required.
        fallback: Rgb,
    },
}

/// Resolved paint of the current color.
#[derive(Debug, Clone)]
pub struct BrushDescriptor {
    color: DescriptorColor,
    precision: ColorPrecision,
}

impl BrushDescriptor {
    pub fn gray(v: f64) -> Self {
        Self::new(DescriptorColor::Gray(v.clamp(0.0, 1.0)))
    }

    pub fn rgb(v: Rgb) -> Self {
        Self::new(DescriptorColor::Rgb(Rgb::new(
            v.r.clamp(0.0, 1.0),
            v.g.clamp(0.0, 1.0),
            v.b.clamp(0.0, 1.0),
        )))
    }

    pub fn cmyk(v: [f64; 4]) -> Self {
        Self::new(DescriptorColor::Cmyk(v.map(|c| c.clamp(0.0, 1.0))))
    }

    pub fn pattern(pattern: Rc<PatternBrush>, fallback: Rgb) -> Self {
        Self::new(DescriptorColor::Pattern { pattern, fallback })
    }

    /// Mid-gray of placeholder precision.
    pub fn placeholder() -> Self {
        Self::gray(0.5).with_precision(ColorPrecision::Placeholder)
    }

    fn new(color: DescriptorColor) -> Self {
        Self {
            color,
            precision: ColorPrecision::Precise,
        }
    }

    pub fn precision(&self) -> ColorPrecision {
        self.precision
    }

    /// Lower precision to `precision`, never raises it.
    pub fn with_precision(mut self, precision: ColorPrecision) -> Self {
        self.precision = self.precision.worst(precision);
        self
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self.color, DescriptorColor::Pattern { .. })
    }

    pub fn as_gray(&self) -> f64 {
        match &self.color {
            DescriptorColor::Gray(v) => *v,
            _ => self.as_rgb().to_gray(),
        }
    }

    pub fn as_rgb(&self) -> Rgb {
        match &self.color {
            DescriptorColor::Gray(v) => Rgb::gray(*v),
            DescriptorColor::Rgb(v) => *v,
            DescriptorColor::Cmyk([c, m, y, k]) => Rgb::from_cmyk(*c, *m, *y, *k),
            DescriptorColor::Pattern { fallback, .. } => *fallback,
        }
    }

    pub fn as_cmyk(&self) -> [f64; 4] {
        match &self.color {
            DescriptorColor::Gray(v) => [0.0, 0.0, 0.0, 1.0 - v],
            DescriptorColor::Cmyk(v) => *v,
            _ => self.as_rgb().to_cmyk(),
        }
    }

    /// Paint for a region, `bounds` is the device box of painted geometry.
    pub fn brush(&self, bounds: &DeviceRect) -> Brush {
        match &self.color {
            DescriptorColor::Pattern { pattern, .. } => pattern.brush(bounds),
            _ => Brush::Solid(self.as_rgb()),
        }
    }
}

/// Lookup of an Indexed color space.
#[derive(Debug, Clone)]
pub enum IndexedLookup {
    /// `n` bytes per entry, `n` is component count of the base space.
    Table(Vec<u8>),
    /// Tint transform procedure mapping index to base components.
    Procedure(Operand),
}

#[derive(Debug, Clone)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    Pattern {
        /// Space of the color given to uncolored patterns.
        underlying: Option<Rc<ColorSpace>>,
    },
    /// Also Separation, which is DeviceN of one colorant.
    DeviceN {
        names: Vec<Name>,
        alternate: Rc<ColorSpace>,
        tint_transform: Operand,
    },
    Indexed {
        base: Rc<ColorSpace>,
        hival: i32,
        lookup: IndexedLookup,
    },
    /// CIE based and ICC spaces, approximated as gray.
    CieBased { n: usize },
    Unknown(Name),
}

impl ColorSpace {
    /// Create color space from name or color space array.
    pub fn from_operand(m: &mut Machine, v: &Operand) -> MachineResult<Rc<Self>> {
        m.enter_nested()?;
        let r = Self::from_operand_inner(m, v);
        m.leave_nested();
        r
    }

    fn from_operand_inner(m: &mut Machine, v: &Operand) -> MachineResult<Rc<Self>> {
        let (family, params) = match v.value() {
            Value::Name(n) => (n.clone(), vec![]),
            Value::Array(a) | Value::Procedure(a) => {
                let a = a.borrow();
                let (first, rest) = a.split_first().ok_or(MachineError::RangeCheck)?;
                (first.name_value()?, rest.to_vec())
            }
            _ => return Err(MachineError::TypeCheck),
        };
        let param = |i: usize| params.get(i).ok_or(MachineError::RangeCheck);

        Ok(Rc::new(match family.as_str() {
            "DeviceGray" => Self::DeviceGray,
            "DeviceRGB" => Self::DeviceRgb,
            "DeviceCMYK" => Self::DeviceCmyk,
            "Pattern" => Self::Pattern {
                underlying: params
                    .first()
                    .map(|v| Self::from_operand(m, v))
                    .transpose()?,
            },
            "Separation" => Self::DeviceN {
                names: vec![crate::name(&param(0)?.text()?)],
                alternate: Self::from_operand(m, param(1)?)?,
                tint_transform: param(2)?.clone(),
            },
            "DeviceN" if m.option().level() >= 3 => Self::DeviceN {
                names: param(0)?
                    .array_like()?
                    .borrow()
                    .iter()
                    .map(Operand::name_value)
                    .collect::<MachineResult<_>>()?,
                alternate: Self::from_operand(m, param(1)?)?,
                tint_transform: param(2)?.clone(),
            },
            "Indexed" => {
                let base = Self::from_operand(m, param(0)?)?;
                let hival = param(1)?.int()?;
                let lookup = param(2)?;
                let lookup = match lookup.value() {
                    Value::String(s) => IndexedLookup::Table(s.bytes()?.clone()),
                    Value::Procedure(_) => IndexedLookup::Procedure(lookup.clone()),
                    _ => return Err(MachineError::TypeCheck),
                };
                Self::Indexed {
                    base,
                    hival,
                    lookup,
                }
            }
            "CIEBasedA" | "CalGray" => Self::CieBased { n: 1 },
            "CIEBasedABC" | "CIEBasedDEF" | "CalRGB" | "Lab" => Self::CieBased { n: 3 },
            "CIEBasedDEFG" => Self::CieBased { n: 4 },
            "ICCBased" => {
                let n = param(0)?
                    .dict_value()?
                    .borrow()
                    .get_by_name("N")
                    .map(Operand::int)
                    .transpose()?
                    .unwrap_or(3);
                Self::CieBased {
                    n: usize::try_from(n).map_err(|_| MachineError::RangeCheck)?,
                }
            }
            _ => {
                // named color space resource
                if params.is_empty() {
                    let found = m
                        .resources()
                        .borrow()
                        .try_find(&crate::sname("ColorSpace"), v)
                        .cloned();
                    if let Some(found) = found {
                        return Self::from_operand(m, &found);
                    }
                }
                debug!("unknown color space: {family}");
                Self::Unknown(family)
            }
        }))
    }

    /// Family name, as the first element of a color space array.
    pub fn family(&self) -> Name {
        match self {
            Self::DeviceGray => crate::sname("DeviceGray"),
            Self::DeviceRgb => crate::sname("DeviceRGB"),
            Self::DeviceCmyk => crate::sname("DeviceCMYK"),
            Self::Pattern { .. } => crate::sname("Pattern"),
            Self::DeviceN { names, .. } if names.len() == 1 => crate::sname("Separation"),
            Self::DeviceN { .. } => crate::sname("DeviceN"),
            Self::Indexed { .. } => crate::sname("Indexed"),
            Self::CieBased { .. } => crate::sname("ICCBased"),
            Self::Unknown(n) => n.clone(),
        }
    }

    /// Number of components `setcolor` takes.
    pub fn components(&self) -> usize {
        match self {
            Self::DeviceGray | Self::Indexed { .. } | Self::Unknown(_) => 1,
            Self::DeviceRgb => 3,
            Self::DeviceCmyk => 4,
            Self::Pattern { underlying } => underlying.as_ref().map_or(0, |u| u.components()) + 1,
            Self::DeviceN { names, .. } => names.len(),
            Self::CieBased { n } => *n,
        }
    }

    pub fn precision(&self) -> ColorPrecision {
        match self {
            Self::DeviceGray | Self::DeviceRgb | Self::DeviceCmyk => ColorPrecision::Precise,
            Self::Pattern { underlying } => underlying
                .as_ref()
                .map_or(ColorPrecision::Precise, |u| u.precision()),
            Self::DeviceN { alternate, .. } => alternate.precision(),
            Self::Indexed { base, .. } => base.precision(),
            Self::CieBased { .. } | Self::Unknown(_) => ColorPrecision::Placeholder,
        }
    }

    /// Color selected by `setcolorspace`.
    pub fn initial_color(&self) -> Vec<Operand> {
        match self {
            Self::DeviceCmyk => vec![0.into(), 0.into(), 0.into(), 1.into()],
            Self::DeviceN { names, .. } => vec![1.into(); names.len()],
            Self::Pattern { .. } => vec![Operand::null()],
            _ => vec![0.into(); self.components()],
        }
    }

    /// Concrete color of components. Pattern spaces resolve to the color of
    /// the underlying space, or the placeholder color.
    pub fn get_color(&self, m: &mut Machine, components: &[f64]) -> MachineResult<Rgb> {
        let c = |i: usize| components.get(i).copied().unwrap_or(0.0);
        Ok(match self {
            Self::DeviceGray => Rgb::gray(c(0)),
            Self::DeviceRgb => Rgb::new(c(0), c(1), c(2)),
            Self::DeviceCmyk => Rgb::from_cmyk(c(0), c(1), c(2), c(3)),
            Self::Pattern { underlying } => match underlying {
                Some(u) => u.get_color(m, components)?,
                None => Rgb::PLACEHOLDER,
            },
            Self::DeviceN {
                alternate,
                tint_transform,
                ..
            } => {
                let inputs: Vec<Operand> = components.iter().copied().map(Operand::from).collect();
                let alt = exec_tint_transform(m, tint_transform, &inputs, alternate.components())?;
                alternate.get_color(m, &alt)?
            }
            Self::Indexed { base, .. } => {
                let values = self.lookup(m, c(0))?;
                base.get_color(m, &values)?
            }
            Self::CieBased { .. } => Rgb::gray(average(components)),
            Self::Unknown(_) => Rgb::PLACEHOLDER,
        })
    }

    /// Resolve components to brush descriptor. For Pattern spaces the last
    /// component is the pattern dictionary.
    pub fn brush_descriptor(
        &self,
        m: &mut Machine,
        components: &[Operand],
    ) -> MachineResult<BrushDescriptor> {
        let numbers = || -> MachineResult<Vec<f64>> {
            components.iter().map(Operand::real).collect()
        };
        Ok(match self {
            Self::DeviceGray => BrushDescriptor::gray(self.get_color(m, &numbers()?)?.r),
            Self::DeviceRgb => BrushDescriptor::rgb(self.get_color(m, &numbers()?)?),
            Self::DeviceCmyk => {
                let n = numbers()?;
                let c = |i: usize| n.get(i).copied().unwrap_or(0.0);
                BrushDescriptor::cmyk([c(0), c(1), c(2), c(3)])
            }
            Self::Pattern { underlying } => {
                let (pattern, under) = components
                    .split_last()
                    .ok_or(MachineError::StackUnderflow)?;
                // colored patterns carry no underlying components
                let under = underlying
                    .as_ref()
                    .filter(|_| !under.is_empty())
                    .map(|u| u.brush_descriptor(m, under))
                    .transpose()?;
                match pattern.value() {
                    Value::Dictionary(d) => {
                        let (brush, precision) = m.activate_pattern(d, under.as_ref())?;
                        let fallback = under.as_ref().map_or(Rgb::PLACEHOLDER, |u| u.as_rgb());
                        BrushDescriptor::pattern(Rc::new(brush), fallback).with_precision(precision)
                    }
                    // no pattern selected yet
                    Value::Null => BrushDescriptor::gray(0.0),
                    _ => return Err(MachineError::TypeCheck),
                }
            }
            Self::DeviceN {
                alternate,
                tint_transform,
                ..
            } => {
                numbers()?;
                let alt = exec_tint_transform(m, tint_transform, components, alternate.components())?;
                let alt: Vec<Operand> = alt.into_iter().map(Operand::from).collect();
                alternate.brush_descriptor(m, &alt)?
            }
            Self::Indexed { base, .. } => {
                let index = components.first().ok_or(MachineError::StackUnderflow)?.real()?;
                let values: Vec<Operand> = self
                    .lookup(m, index)?
                    .into_iter()
                    .map(Operand::from)
                    .collect();
                base.brush_descriptor(m, &values)?
            }
            Self::CieBased { .. } => BrushDescriptor::gray(average(&numbers()?))
                .with_precision(ColorPrecision::Placeholder),
            Self::Unknown(_) => BrushDescriptor::placeholder(),
        }
        .with_precision(self.precision()))
    }

    /// Base space components of an Indexed color, index clamped to
    /// `[0, hival]`.
    fn lookup(&self, m: &mut Machine, index: f64) -> MachineResult<Vec<f64>> {
        let Self::Indexed {
            base,
            hival,
            lookup,
        } = self
        else {
            return Err(MachineError::TypeCheck);
        };
        #[allow(clippy::cast_possible_truncation)]
        let index = (index.round() as i64).clamp(0, i64::from((*hival).max(0)));
        let n = base.components();
        match lookup {
            IndexedLookup::Table(table) => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let start = index as usize * n;
                let entry = table.get(start..start + n).ok_or_else(|| {
                    error!("indexed lookup table too short for index {index}");
                    MachineError::RangeCheck
                })?;
                Ok(entry.iter().map(|v| f64::from(*v) / 255.0).collect())
            }
            IndexedLookup::Procedure(p) => {
                let index = i32::try_from(index).map_err(|_| MachineError::RangeCheck)?;
                exec_tint_transform(m, p, &[index.into()], n)
            }
        }
    }
}

fn average(v: &[f64]) -> f64 {
    if v.is_empty() {
        0.0
    } else {
        v.iter().sum::<f64>() / v.len() as f64
    }
}

/// Run tint transform procedure: push inputs, execute, pop `n_out` results.
/// Results popped in reverse are put back into pushed order. The procedure
/// must leave the operand stack at its original depth.
pub fn exec_tint_transform(
    m: &mut Machine,
    proc: &Operand,
    inputs: &[Operand],
    n_out: usize,
) -> MachineResult<Vec<f64>> {
    let depth = m.operand_stack().len();
    for v in inputs {
        m.push(v.clone());
    }
    m.execute_object(proc.with_executable(true))?;
    let mut r = Vec::with_capacity(n_out);
    for _ in 0..n_out {
        r.push(m.pop()?.real()?);
    }
    r.reverse();

    let after = m.operand_stack().len();
    if after != depth {
        error!("tint transform changed operand stack depth from {depth} to {after}");
        if after < depth {
            return Err(MachineError::StackUnderflow);
        }
        m.truncate_operands(depth);
    }
    Ok(r)
}

#[cfg(test)]
mod tests;
