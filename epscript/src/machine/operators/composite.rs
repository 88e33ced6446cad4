use super::built_in_ops;
use crate::{
    dictionary::{DictionaryStackHelper, EpsDictionary},
    machine::Machine,
    operand::{Operand, PsString, Value},
    MachineError, MachineResult,
};
use log::warn;
use std::{cell::RefCell, rc::Rc};

fn index_of(v: &Operand, len: usize) -> MachineResult<usize> {
    usize::try_from(v.int()?)
        .ok()
        .filter(|i| *i < len)
        .ok_or(MachineError::RangeCheck)
}

/// Checked `index..index + count` inside `len`.
fn interval(index: i32, count: i32, len: usize) -> MachineResult<std::ops::Range<usize>> {
    let index = usize::try_from(index).map_err(|_| MachineError::RangeCheck)?;
    let count = usize::try_from(count).map_err(|_| MachineError::RangeCheck)?;
    let end = index.checked_add(count).ok_or(MachineError::RangeCheck)?;
    if end > len {
        return Err(MachineError::RangeCheck);
    }
    Ok(index..end)
}

/// Largest array, string or dict a program may create.
const MAX_LENGTH: usize = 65535;

fn pop_length(m: &mut Machine) -> MachineResult<usize> {
    let n = m.pop_count()?;
    if n > MAX_LENGTH {
        return Err(MachineError::LimitCheck);
    }
    Ok(n)
}

fn byte_of(v: &Operand) -> MachineResult<u8> {
    u8::try_from(v.int()?).map_err(|_| MachineError::RangeCheck)
}

fn new_dict() -> Operand {
    Operand::dict(Rc::new(RefCell::new(EpsDictionary::new())))
}

/// Run `proc` for each item, as `forall` does.
fn for_each(m: &mut Machine, items: Vec<Vec<Operand>>, proc: Operand) -> MachineResult<()> {
    for args in items {
        for a in args {
            m.push(a);
        }
        m.execute_object(proc.clone())?;
        if m.break_current_loop() {
            break;
        }
    }
    m.end_loop();
    Ok(())
}

pub(super) fn register(d: &mut EpsDictionary, level: u8) {
    built_in_ops!(d;
        // int array -> array of nulls
        "array" => |m| {
            let n = pop_length(m)?;
            m.push(Operand::array(vec![Operand::null(); n]));
            Ok(())
        },
        // - [ -> mark
        "[" => |m| {
            m.push(Operand::mark());
            Ok(())
        },
        // mark obj0 .. obj(n-1) ] -> array
        "]" => |m| {
            let items = m.pop_to_mark()?;
            m.push(Operand::array(items));
            Ok(())
        },
        // array|dict|string|name length -> int
        "length" => |m| {
            let v = m.pop()?;
            let n = match v.value() {
                Value::Array(a) | Value::Procedure(a) => a.borrow().len(),
                Value::Dictionary(d) => d.borrow().len(),
                Value::String(s) => s.bytes()?.len(),
                Value::Name(n) => n.len(),
                _ => return Err(MachineError::TypeCheck),
            };
            m.push(Operand::from_len(n)?);
            Ok(())
        },
        // array index get -> any
        // dict key get -> any
        // string index get -> int
        "get" => |m| {
            let key = m.pop()?;
            let v = m.pop()?;
            let r = match v.value() {
                Value::Array(a) | Value::Procedure(a) => {
                    let a = a.borrow();
                    a[index_of(&key, a.len())?].clone()
                }
                Value::Dictionary(d) => d.borrow().find(&key)?.clone(),
                Value::String(s) => {
                    let s = s.bytes()?;
                    i32::from(s[index_of(&key, s.len())?]).into()
                }
                _ => return Err(MachineError::TypeCheck),
            };
            m.push(r);
            Ok(())
        },
        // array index any put -
        // dict key any put -
        // string index int put -
        "put" => |m| {
            let value = m.pop()?;
            let key = m.pop()?;
            let v = m.pop()?;
            match v.value() {
                Value::Array(a) | Value::Procedure(a) => {
                    let mut a = a.borrow_mut();
                    let i = index_of(&key, a.len())?;
                    a[i] = value;
                }
                Value::Dictionary(d) => d.borrow_mut().add(key, value),
                Value::String(s) => {
                    let mut s = s.bytes_mut()?;
                    let i = index_of(&key, s.len())?;
                    s[i] = byte_of(&value)?;
                }
                _ => return Err(MachineError::TypeCheck),
            }
            Ok(())
        },
        // array index count getinterval -> subarray
        // string index count getinterval -> substring
        "getinterval" => |m| {
            let count = m.pop_int()?;
            let index = m.pop_int()?;
            let v = m.pop()?;
            let r = match v.value() {
                Value::Array(a) | Value::Procedure(a) => {
                    let a = a.borrow();
                    Operand::array(a[interval(index, count, a.len())?].to_vec())
                        .with_executable(v.is_executable())
                }
                Value::String(s) => {
                    let s = s.bytes()?;
                    Operand::string(PsString::literal(&s[interval(index, count, s.len())?]))
                }
                _ => return Err(MachineError::TypeCheck),
            };
            m.push(r);
            Ok(())
        },
        // array1 index array2 putinterval -
        // string1 index string2 putinterval -
        "putinterval" => |m| {
            let src = m.pop()?;
            let index = m.pop_int()?;
            let dest = m.pop()?;
            match (dest.value(), src.value()) {
                (Value::Array(d) | Value::Procedure(d), Value::Array(s) | Value::Procedure(s)) => {
                    let s = s.borrow().clone();
                    let count = i32::try_from(s.len()).map_err(|_| MachineError::RangeCheck)?;
                    let mut d = d.borrow_mut();
                    let range = interval(index, count, d.len())?;
                    d[range].clone_from_slice(&s);
                }
                (Value::String(d), Value::String(s)) => {
                    let s = s.bytes()?.clone();
                    let count = i32::try_from(s.len()).map_err(|_| MachineError::RangeCheck)?;
                    let mut d = d.bytes_mut()?;
                    let range = interval(index, count, d.len())?;
                    d[range].copy_from_slice(&s);
                }
                _ => return Err(MachineError::TypeCheck),
            }
            Ok(())
        },
        // array aload -> a0 .. a(n-1) array
        "aload" => |m| {
            let v = m.pop()?;
            let items = v.array_like()?.borrow().clone();
            for item in items {
                m.push(item);
            }
            m.push(v);
            Ok(())
        },
        // any0 .. any(n-1) array astore -> array
        "astore" => |m| {
            let v = m.pop()?;
            let a = v.array_like()?;
            let n = a.borrow().len();
            let items = m.pop_n(n)?;
            *a.borrow_mut() = items;
            m.push(v);
            Ok(())
        },
        // array proc forall -
        // dict proc forall -
        // string proc forall -
        "forall" => |m| {
            let proc = m.pop()?;
            let v = m.pop()?;
            let items: Vec<Vec<Operand>> = match v.value() {
                Value::Array(a) | Value::Procedure(a) => {
                    a.borrow().iter().map(|v| vec![v.clone()]).collect()
                }
                Value::Dictionary(d) => d
                    .borrow()
                    .iter()
                    .map(|(k, v)| vec![k.clone(), v.clone()])
                    .collect(),
                Value::String(s) => s
                    .bytes()?
                    .iter()
                    .map(|b| vec![Operand::from(i32::from(*b))])
                    .collect(),
                _ => return Err(MachineError::TypeCheck),
            };
            for_each(m, items, proc)
        },
        // int string -> string of n zero bytes
        "string" => |m| {
            let n = pop_length(m)?;
            m.push(Operand::string(PsString::literal(vec![0u8; n])));
            Ok(())
        },
        // int dict -> dict
        "dict" => |m| {
            pop_length(m)?;
            m.push(new_dict());
            Ok(())
        },
        // dict begin -
        "begin" => |m| {
            let d = m.pop()?.dict_value()?;
            m.dict_stack.push(d);
            Ok(())
        },
        // - end -
        "end" => |m| {
            if m.dict_stack.len() <= 3 {
                warn!("end without matching begin");
                return Ok(());
            }
            m.dict_stack.pop()?;
            Ok(())
        },
        // key value def -
        "def" => |m| {
            let value = m.pop()?;
            let key = m.pop()?;
            m.current_dict()?.borrow_mut().add(key, value);
            Ok(())
        },
        // key load -> value
        "load" => |m| {
            let key = m.pop()?;
            let v = m
                .dict_stack
                .find_value(&key)
                .ok_or_else(|| MachineError::Undefined(crate::dictionary::key_name(&key)))?;
            m.push(v);
            Ok(())
        },
        // key value store -
        "store" => |m| {
            let value = m.pop()?;
            let key = m.pop()?;
            let d = match m.dict_stack.find_dictionary(&key) {
                Some(d) => d,
                None => m.current_dict()?,
            };
            d.borrow_mut().add(key, value);
            Ok(())
        },
        // dict key known -> bool
        "known" => |m| {
            let key = m.pop()?;
            let d = m.pop()?.dict_value()?;
            let known = d.borrow().contains_key(&key);
            m.push(known);
            Ok(())
        },
        // dict key undef -
        "undef" => |m| {
            let key = m.pop()?;
            let d = m.pop()?.dict_value()?;
            d.borrow_mut().remove(&key);
            Ok(())
        },
        // key where -> dict true | false
        "where" => |m| {
            let key = m.pop()?;
            match m.dict_stack.find_dictionary(&key) {
                Some(d) => {
                    m.push(d);
                    m.push(true);
                }
                None => m.push(false),
            }
            Ok(())
        },
        "currentdict" => |m| {
            let d = m.current_dict()?;
            m.push(d);
            Ok(())
        },
        "countdictstack" => |m| {
            let n = Operand::from_len(m.dict_stack.len())?;
            m.push(n);
            Ok(())
        },
        // pop dictionaries pushed by begin
        "cleardictstack" => |m| {
            m.dict_stack.remove_non_permanent_dictionaries();
            Ok(())
        },
        "systemdict" => |m| {
            m.push(m.dicts.system.clone());
            Ok(())
        },
        "globaldict" => |m| {
            m.push(m.dicts.global.clone());
            Ok(())
        },
        "userdict" => |m| {
            m.push(m.dicts.user.clone());
            Ok(())
        },
        "errordict" => |m| {
            m.push(m.dicts.error.clone());
            Ok(())
        },
        "$error" => |m| {
            m.push(m.dicts.dollar_error.clone());
            Ok(())
        },
        "statusdict" => |m| {
            m.push(m.dicts.status.clone());
            Ok(())
        },
        "FontDirectory" => |m| {
            m.push(m.dicts.font.clone());
            Ok(())
        },
        // dict maxlength -> int
        "maxlength" => |m| {
            let d = m.pop()?.dict_value()?;
            let n = Operand::from_len(d.borrow().len().max(1))?;
            m.push(n);
            Ok(())
        },
    );

    if level >= 2 {
        built_in_ops!(d;
            // - << -> mark
            "<<" => |m| {
                m.push(Operand::mark());
                Ok(())
            },
            // mark key1 value1 .. key(n) value(n) >> -> dict
            ">>" => |m| {
                let items = m.pop_to_mark()?;
                if items.len() % 2 != 0 {
                    return Err(MachineError::RangeCheck);
                }
                let mut iter = items.into_iter();
                let mut d = EpsDictionary::new();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    d.add(k, v);
                }
                m.push(Operand::new_dict(d));
                Ok(())
            },
        );
    }
}
