use crate::{
    decode::{decode_ascii85, decode_hex_string},
    dictionary::EpsDictionary, machine::Machine, name, sname,
    MachineError, MachineResult, Name,
};
use educe::Educe;
use either::Either;
use std::{
    cell::{Ref, RefCell, RefMut},
    fmt::{Debug, Write},
    rc::Rc,
};

pub type ArrayRef = Rc<RefCell<Vec<Operand>>>;
pub type DictRef = Rc<RefCell<EpsDictionary>>;
pub type OperatorFn = fn(&mut Machine) -> MachineResult<()>;

/// Native operation bound to a name in `systemdict` or `errordict`.
#[derive(Clone, Copy, Educe)]
#[educe(Debug)]
pub struct Command {
    name: &'static str,
    #[educe(Debug(ignore))]
    op: OperatorFn,
    /// Executed even while a procedure body is being collected.
    always_execute: bool,
}

impl Command {
    pub const fn new(name: &'static str, op: OperatorFn) -> Self {
        Self {
            name,
            op,
            always_execute: false,
        }
    }

    pub const fn always(name: &'static str, op: OperatorFn) -> Self {
        Self {
            name,
            op,
            always_execute: true,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn always_execute(&self) -> bool {
        self.always_execute
    }

    pub fn invoke(&self, m: &mut Machine) -> MachineResult<()> {
        (self.op)(m)
    }
}

/// How a string was written in the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEncoding {
    /// `(text)`
    Literal,
    /// `<hex digits>`, already converted to bytes.
    Hex,
    /// `<~base85~>`, kept encoded until used.
    Base85,
}

#[derive(Debug)]
struct StringData {
    bytes: Vec<u8>,
    encoding: StringEncoding,
}

/// Mutable PostScript string shared by reference.
#[derive(Debug, Clone)]
pub struct PsString(Rc<RefCell<StringData>>);

impl PsString {
    pub fn new(bytes: Vec<u8>, encoding: StringEncoding) -> Self {
        Self(Rc::new(RefCell::new(StringData { bytes, encoding })))
    }

    pub fn literal(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(bytes.into(), StringEncoding::Literal)
    }

    pub fn encoding(&self) -> StringEncoding {
        self.0.borrow().encoding
    }

    /// Bytes as stored, base-85 strings are not decoded.
    pub fn raw(&self) -> Ref<'_, Vec<u8>> {
        Ref::map(self.0.borrow(), |d| &d.bytes)
    }

    /// Decode content in place, so later access works on plain bytes.
    fn normalize(&self) -> MachineResult<()> {
        let mut d = self.0.borrow_mut();
        d.bytes = match d.encoding {
            StringEncoding::Literal => return Ok(()),
            StringEncoding::Hex => decode_hex_string(&d.bytes),
            StringEncoding::Base85 => decode_ascii85(&d.bytes)?,
        };
        d.encoding = StringEncoding::Literal;
        Ok(())
    }

    /// Decoded bytes.
    pub fn bytes(&self) -> MachineResult<Ref<'_, Vec<u8>>> {
        self.normalize()?;
        Ok(self.raw())
    }

    pub fn bytes_mut(&self) -> MachineResult<RefMut<'_, Vec<u8>>> {
        self.normalize()?;
        Ok(RefMut::map(self.0.borrow_mut(), |d| &mut d.bytes))
    }

    pub fn text(&self) -> MachineResult<String> {
        Ok(String::from_utf8_lossy(&self.bytes()?).into_owned())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i32),
    Real(f64),
    Name(Name),
    String(PsString),
    Array(ArrayRef),
    /// Array executed when invoked by name.
    Procedure(ArrayRef),
    Dictionary(DictRef),
    File(Name),
    Mark,
    Command(Command),
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r:?}"),
            Value::Name(n) => write!(f, "/{n}"),
            Value::String(s) => write!(f, "({})", String::from_utf8_lossy(&s.raw())),
            Value::Array(a) => f.debug_list().entries(a.borrow().iter()).finish(),
            Value::Procedure(p) => {
                f.write_char('{')?;
                f.debug_list().entries(p.borrow().iter()).finish()?;
                f.write_char('}')
            }
            // dictionaries may contain themselves, never recurse
            Value::Dictionary(d) => write!(f, "<<dict {}>>", d.borrow().len()),
            Value::File(n) => write!(f, "file({n})"),
            Value::Mark => write!(f, "mark"),
            Value::Command(c) => write!(f, "--{}--", c.name()),
        }
    }
}

/// One PostScript datum plus its executable flag.
#[derive(Clone)]
pub struct Operand {
    value: Value,
    executable: bool,
}

impl Debug for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Value::Name(n) if self.executable => write!(f, "{n}"),
            v => v.fmt(f),
        }
    }
}

impl PartialEq for Operand {
    /// Test helper equality: same as `eq` operator, unsupported pairs are
    /// not equal. Executable flag is not compared.
    fn eq(&self, other: &Self) -> bool {
        self.key_eq(other)
    }
}

impl Operand {
    pub fn new(value: Value, executable: bool) -> Self {
        Self { value, executable }
    }

    pub fn null() -> Self {
        Self::new(Value::Null, false)
    }

    pub fn mark() -> Self {
        Self::new(Value::Mark, false)
    }

    /// Literal name, `/foo` in script.
    pub fn name(s: &str) -> Self {
        Self::new(Value::Name(name(s)), false)
    }

    /// Executable name, `foo` in script.
    pub fn executable_name(s: &str) -> Self {
        Self::new(Value::Name(name(s)), true)
    }

    pub fn string(s: PsString) -> Self {
        Self::new(Value::String(s), false)
    }

    pub fn array(items: Vec<Operand>) -> Self {
        Self::new(Value::Array(Rc::new(RefCell::new(items))), false)
    }

    pub fn procedure(items: Vec<Operand>) -> Self {
        Self::new(Value::Procedure(Rc::new(RefCell::new(items))), true)
    }

    pub fn dict(d: DictRef) -> Self {
        Self::new(Value::Dictionary(d), false)
    }

    pub fn new_dict(d: EpsDictionary) -> Self {
        Self::dict(Rc::new(RefCell::new(d)))
    }

    pub fn command(c: Command) -> Self {
        Self::new(Value::Command(c), true)
    }

    pub fn file(name: Name) -> Self {
        Self::new(Value::File(name), false)
    }

    /// Integer operand from a length or count.
    pub fn from_len(n: usize) -> MachineResult<Self> {
        i32::try_from(n)
            .map(Self::from)
            .map_err(|_| MachineError::LimitCheck)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn is_executable(&self) -> bool {
        self.executable
    }

    /// Copy with executable flag changed, composite contents stay shared.
    pub fn with_executable(&self, executable: bool) -> Self {
        let value = match (&self.value, executable) {
            (Value::Array(a), true) => Value::Procedure(a.clone()),
            (Value::Procedure(a), false) => Value::Array(a.clone()),
            (v, _) => v.clone(),
        };
        Self::new(value, executable)
    }

    pub fn is_mark(&self) -> bool {
        matches!(self.value, Value::Mark)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Null)
    }

    /// Executable name, returns the name.
    pub fn opt_executable_name(&self) -> Option<&Name> {
        match &self.value {
            Value::Name(n) if self.executable => Some(n),
            _ => None,
        }
    }

    pub fn opt_number(&self) -> Option<Either<i32, f64>> {
        match self.value {
            Value::Integer(i) => Some(Either::Left(i)),
            Value::Real(r) => Some(Either::Right(r)),
            _ => None,
        }
    }

    pub fn number(&self) -> MachineResult<Either<i32, f64>> {
        self.opt_number().ok_or(MachineError::TypeCheck)
    }

    /// Integer or real as f64.
    pub fn real(&self) -> MachineResult<f64> {
        self.number().map(|n| n.map_left(f64::from).into_inner())
    }

    /// Array or procedure contents.
    pub fn array_like(&self) -> MachineResult<ArrayRef> {
        match &self.value {
            Value::Array(a) | Value::Procedure(a) => Ok(a.clone()),
            _ => Err(MachineError::TypeCheck),
        }
    }

    /// Name or string as text, strings are used as names in keys.
    pub fn text(&self) -> MachineResult<String> {
        match &self.value {
            Value::Name(n) => Ok(n.as_str().to_owned()),
            Value::String(s) => s.text(),
            _ => Err(MachineError::TypeCheck),
        }
    }

    /// Read array or procedure of numbers.
    pub fn numbers(&self) -> MachineResult<Vec<f64>> {
        self.array_like()?.borrow().iter().map(|v| v.real()).collect()
    }

    pub fn type_name(&self) -> Name {
        sname(match self.value {
            Value::Null => "nulltype",
            Value::Bool(_) => "booleantype",
            Value::Integer(_) => "integertype",
            Value::Real(_) => "realtype",
            Value::Name(_) => "nametype",
            Value::String(_) => "stringtype",
            Value::Array(_) | Value::Procedure(_) => "arraytype",
            Value::Dictionary(_) => "dicttype",
            Value::File(_) => "filetype",
            Value::Mark => "marktype",
            Value::Command(_) => "operatortype",
        })
    }

    /// PostScript equality. Integer and real compare by value, name and
    /// string by text, composite objects by identity. Comparing unrelated
    /// types is a type check error.
    pub fn try_eq(&self, other: &Operand) -> MachineResult<bool> {
        use Value::*;
        Ok(match (&self.value, &other.value) {
            (Null, Null) | (Mark, Mark) => true,
            (Null, _) | (_, Null) => false,
            (Bool(a), Bool(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Real(a), Real(b)) => a == b,
            (Integer(a), Real(b)) | (Real(b), Integer(a)) => f64::from(*a) == *b,
            (Name(a), Name(b)) => a == b,
            (String(a), String(b)) => a.ptr_eq(b) || *a.bytes()? == *b.bytes()?,
            (Name(a), String(b)) | (String(b), Name(a)) => {
                b.bytes()?.as_slice() == a.as_str().as_bytes()
            }
            (Array(a) | Procedure(a), Array(b) | Procedure(b)) => Rc::ptr_eq(a, b),
            (Dictionary(a), Dictionary(b)) => Rc::ptr_eq(a, b),
            (Command(a), Command(b)) => a.name() == b.name(),
            (File(a), File(b)) => a == b,
            _ => return Err(MachineError::TypeCheck),
        })
    }

    /// Equality used to match dictionary keys: unsupported pairs never match.
    pub fn key_eq(&self, other: &Operand) -> bool {
        self.try_eq(other).unwrap_or(false)
    }

    /// Ordering for numbers and strings, other types are type check error.
    pub fn try_lt(&self, other: &Operand) -> MachineResult<bool> {
        use Value::*;
        Ok(match (&self.value, &other.value) {
            (Integer(a), Integer(b)) => a < b,
            (Integer(_) | Real(_), Integer(_) | Real(_)) => self.real()? < other.real()?,
            (String(a), String(b)) => *a.bytes()? < *b.bytes()?,
            _ => return Err(MachineError::TypeCheck),
        })
    }

    pub fn try_gt(&self, other: &Operand) -> MachineResult<bool> {
        other.try_lt(self)
    }

    /// Text form used by `cvs` and `=`.
    pub fn to_text(&self) -> MachineResult<String> {
        Ok(match &self.value {
            Value::Null => "null".to_owned(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) if r.fract() == 0.0 && r.abs() < 1e15 => format!("{r:.1}"),
            Value::Real(r) => r.to_string(),
            Value::Name(n) => n.to_string(),
            Value::String(s) => s.text()?,
            Value::Command(c) => format!("--{}--", c.name()),
            Value::File(n) => n.to_string(),
            _ => "--nostringval--".to_owned(),
        })
    }
}

macro_rules! operand_access {
    ($method:ident, $opt_method:ident, $branch:ident, $t: ty) => {
        impl Operand {
            #[allow(dead_code)]
            pub fn $opt_method(&self) -> Option<$t> {
                match &self.value {
                    Value::$branch(v) => Some(v.clone()),
                    _ => None,
                }
            }

            #[allow(dead_code)]
            pub fn $method(&self) -> MachineResult<$t> {
                match &self.value {
                    Value::$branch(v) => Ok(v.clone()),
                    _ => Err(MachineError::TypeCheck),
                }
            }
        }
    };
}

operand_access!(bool, opt_bool, Bool, bool);
operand_access!(int, opt_int, Integer, i32);
operand_access!(name_value, opt_name_value, Name, Name);
operand_access!(string_value, opt_string_value, String, PsString);
operand_access!(array_value, opt_array_value, Array, ArrayRef);
operand_access!(procedure_value, opt_procedure_value, Procedure, ArrayRef);
operand_access!(dict_value, opt_dict_value, Dictionary, DictRef);
operand_access!(command_value, opt_command_value, Command, Command);

macro_rules! to_operand {
    ($t:ty, $branch:ident) => {
        impl From<$t> for Operand {
            fn from(v: $t) -> Self {
                Self::new(Value::$branch(v), false)
            }
        }
    };
}
to_operand!(bool, Bool);
to_operand!(i32, Integer);
to_operand!(f64, Real);
to_operand!(Name, Name);
to_operand!(PsString, String);
to_operand!(DictRef, Dictionary);

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Self::name(v)
    }
}

impl From<Vec<Operand>> for Operand {
    fn from(v: Vec<Operand>) -> Self {
        Self::array(v)
    }
}

impl From<Either<i32, f64>> for Operand {
    fn from(v: Either<i32, f64>) -> Self {
        v.either(Self::from, Self::from)
    }
}

impl From<Command> for Operand {
    fn from(c: Command) -> Self {
        Self::command(c)
    }
}
