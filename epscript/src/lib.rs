//! Interpreter for the PostScript subset found in vector EPS exports.
//!
//! [`Machine`] executes operands pulled from an [`OperandSource`], such as the
//! [`Tokenizer`], and collects painted paths into a [`GraphicGroup`] tree.
//! [`read_eps`] wraps it for complete EPS files.

pub mod decode;
pub mod dictionary;
mod error;
pub mod function;
pub mod graphics;
pub(crate) mod machine;
mod name;
pub mod operand;
mod option;
pub mod parser;
pub mod reader;
pub mod resource;
pub mod stack;

pub use error::{MachineError, MachineResult};
pub use graphics::{ColorPrecision, GraphicGroup, GraphicNode, GraphicPath};
pub use machine::{interpret, Machine, StandardDictionaries};
pub use name::{name, sname, Name};
pub use option::{MachineOption, MachineOptionBuilder};
pub use parser::{OperandList, OperandSource, Tokenizer};
pub use reader::{read_eps, EpsDocument};
