use crate::{decode::DecodeError, Name};

/// Errors raised while interpreting a script.
///
/// Most variants are PostScript language errors, which a `stopped` context
/// catches. Variants reported by [`MachineError::is_fatal()`] always abort the
/// whole run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MachineError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("type check error")]
    TypeCheck,
    #[error("undefined: {0}")]
    Undefined(Name),
    #[error("unmatched mark")]
    UnMatchedMark,
    #[error("range check error")]
    RangeCheck,
    #[error("syntax error")]
    SyntaxError,
    #[error("undefined result")]
    UndefinedResult,
    #[error("invalid access")]
    InvalidAccess,
    #[error("undefined resource {key} in category {category}")]
    UndefinedResource { category: Name, key: String },
    #[error("no current point")]
    NoCurrentPoint,
    #[error("limit check error")]
    LimitCheck,
    #[error("invalid restore")]
    InvalidRestore,
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("graphics state stack underflow")]
    GraphicsStackUnderflow,
    #[error("stop outside of any stopped context")]
    UnhandledStop,
    #[error("recursion too deep, limit: {0}")]
    RecursionTooDeep(usize),
    #[error("operation budget of {0} exceeded")]
    ExecutionLimitExceeded(u64),
}

pub type MachineResult<T> = Result<T, MachineError>;

impl MachineError {
    /// Fatal errors are never absorbed by a `stopped` context.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnhandledStop
                | Self::GraphicsStackUnderflow
                | Self::RecursionTooDeep(_)
                | Self::ExecutionLimitExceeded(_)
        )
    }

    /// PostScript error name, stored as `/errorname` in `$error`.
    pub fn error_name(&self) -> &'static str {
        match self {
            Self::StackUnderflow => "stackunderflow",
            Self::TypeCheck => "typecheck",
            Self::Undefined(_) => "undefined",
            Self::UnMatchedMark => "unmatchedmark",
            Self::RangeCheck => "rangecheck",
            Self::SyntaxError => "syntaxerror",
            Self::UndefinedResult => "undefinedresult",
            Self::InvalidAccess => "invalidaccess",
            Self::UndefinedResource { .. } => "undefinedresource",
            Self::NoCurrentPoint => "nocurrentpoint",
            Self::LimitCheck => "limitcheck",
            Self::InvalidRestore => "invalidrestore",
            Self::Unsupported(_) => "unsupported",
            Self::Decode(_) => "ioerror",
            Self::GraphicsStackUnderflow => "stackunderflow",
            Self::UnhandledStop => "stop",
            Self::RecursionTooDeep(_) => "execstackoverflow",
            Self::ExecutionLimitExceeded(_) => "timeout",
        }
    }
}
