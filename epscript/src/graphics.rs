//! Graphics model: transforms, path geometry, color spaces, the graphics
//! state stack and the graphic tree produced by painting operators.

use crate::{operand::Operand, MachineError, MachineResult};
use euclid::Transform2D;

pub mod color_space;
pub mod node;
pub mod path;
pub mod pattern;
pub mod shading;
pub mod state;
pub mod trans;

pub use color_space::{BrushDescriptor, ColorPrecision, ColorSpace, Rgb};
pub use node::{Brush, GradientStop, GraphicGroup, GraphicNode, GraphicPath, StrokeStyle};
pub use path::{FillRule, PathGeometry, PathSegment};
pub use state::{GraphicsState, GraphicsStateStack};

impl<S, T> TryFrom<&Operand> for Transform2D<f64, S, T> {
    type Error = MachineError;

    /// Read matrix `[a b c d tx ty]`.
    fn try_from(v: &Operand) -> MachineResult<Self> {
        let arr = v.numbers()?;
        if arr.len() != 6 {
            return Err(MachineError::RangeCheck);
        }
        Ok(Self::new(arr[0], arr[1], arr[2], arr[3], arr[4], arr[5]))
    }
}

/// Matrix as 6 element PostScript array.
pub fn matrix_operand<S, T>(m: &Transform2D<f64, S, T>) -> Operand {
    Operand::array(m.to_array().into_iter().map(Operand::from).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCapStyle {
    #[default]
    Butt = 0,
    Round = 1,
    Square = 2,
}

impl TryFrom<i32> for LineCapStyle {
    type Error = MachineError;

    fn try_from(v: i32) -> MachineResult<Self> {
        Ok(match v {
            0 => Self::Butt,
            1 => Self::Round,
            2 => Self::Square,
            _ => return Err(MachineError::RangeCheck),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoinStyle {
    #[default]
    Miter = 0,
    Round = 1,
    Bevel = 2,
}

impl TryFrom<i32> for LineJoinStyle {
    type Error = MachineError;

    fn try_from(v: i32) -> MachineResult<Self> {
        Ok(match v {
            0 => Self::Miter,
            1 => Self::Round,
            2 => Self::Bevel,
            _ => return Err(MachineError::RangeCheck),
        })
    }
}
