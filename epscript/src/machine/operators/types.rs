use super::built_in_ops;
use crate::{
    dictionary::{DictionaryStackHelper, EpsDictionary},
    machine::Machine,
    operand::{ArrayRef, Operand, PsString, Value},
    MachineError, MachineResult,
};
use ahash::AHashSet;

/// Replace executable names bound to commands by the command itself,
/// nested procedures are bound too.
fn bind(m: &Machine, proc: &ArrayRef, visited: &mut AHashSet<*const ()>) {
    if !visited.insert(std::rc::Rc::as_ptr(proc).cast()) {
        return;
    }
    let mut items = proc.borrow_mut();
    for item in items.iter_mut() {
        let command = match item.value() {
            Value::Name(n) if item.is_executable() => m
                .dict_stack
                .find_value(&Operand::from(n.clone()))
                .and_then(|v| v.opt_command_value()),
            Value::Procedure(p) => {
                let p = p.clone();
                bind(m, &p, visited);
                None
            }
            _ => None,
        };
        if let Some(c) = command {
            *item = Operand::command(c);
        }
    }
}

/// Access is not enforced, operand is left as is.
fn keep(m: &mut Machine) -> MachineResult<()> {
    m.top()?;
    Ok(())
}

pub(super) fn register(d: &mut EpsDictionary) {
    built_in_ops!(d;
        // any type -> name
        "type" => |m| {
            let t = m.pop()?.type_name();
            m.push(t);
            Ok(())
        },
        "cvx" => |m| {
            let v = m.pop()?;
            m.push(v.with_executable(true));
            Ok(())
        },
        "cvlit" => |m| {
            let v = m.pop()?;
            m.push(v.with_executable(false));
            Ok(())
        },
        "xcheck" => |m| {
            let v = m.pop()?;
            m.push(v.is_executable());
            Ok(())
        },
        // string cvn -> name
        "cvn" => |m| {
            let v = m.pop()?;
            let n = crate::name(&v.string_value()?.text()?);
            m.push(Operand::new(Value::Name(n), v.is_executable()));
            Ok(())
        },
        // any string cvs -> substring
        "cvs" => |m| {
            let buf = m.pop()?.string_value()?;
            let text = m.pop()?.to_text()?;
            let text = text.as_bytes();
            {
                let mut bytes = buf.bytes_mut()?;
                if text.len() > bytes.len() {
                    return Err(MachineError::RangeCheck);
                }
                bytes[..text.len()].copy_from_slice(text);
            }
            m.push(PsString::literal(text));
            Ok(())
        },
        "readonly" => keep,
        "executeonly" => keep,
        "noaccess" => keep,
        "rcheck" => |m| {
            m.pop()?;
            m.push(true);
            Ok(())
        },
        "wcheck" => |m| {
            m.pop()?;
            m.push(true);
            Ok(())
        },
        // proc bind -> proc
        "bind" => |m| {
            let proc = m.top()?.array_like()?;
            bind(m, &proc, &mut AHashSet::new());
            Ok(())
        },
    );
}
