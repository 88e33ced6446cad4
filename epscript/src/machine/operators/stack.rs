use super::built_in_ops;
use crate::{
    dictionary::EpsDictionary,
    operand::{Operand, Value},
    MachineError,
};

pub(super) fn register(d: &mut EpsDictionary) {
    built_in_ops!(d;
        // any pop -
        "pop" => |m| {
            m.pop()?;
            Ok(())
        },
        // any1 any2 exch -> any2 any1
        "exch" => |m| {
            let a = m.pop()?;
            let b = m.pop()?;
            m.push(a);
            m.push(b);
            Ok(())
        },
        // any -> any any
        "dup" => |m| {
            m.push(m.top()?.clone());
            Ok(())
        },
        // any1 .. any(n) n copy -> any1 .. any(n) any1 .. any(n)
        // array1 array2 copy -> subarray2
        // dict1 dict2 copy -> dict2
        // string1 string2 copy -> substring2
        "copy" => |m| {
            let top = m.pop()?;
            match top.value() {
                Value::Integer(n) => {
                    let n = usize::try_from(*n).map_err(|_| MachineError::RangeCheck)?;
                    let items = m.pop_n(n)?;
                    for item in items.iter().chain(items.iter()) {
                        m.push(item.clone());
                    }
                }
                Value::Array(dest) | Value::Procedure(dest) => {
                    let src = m.pop()?.array_like()?;
                    let src = src.borrow().clone();
                    let mut dest_items = dest.borrow_mut();
                    if src.len() > dest_items.len() {
                        return Err(MachineError::RangeCheck);
                    }
                    dest_items[..src.len()].clone_from_slice(&src);
                    drop(dest_items);
                    let sub: Vec<Operand> = dest.borrow()[..src.len()].to_vec();
                    m.push(Operand::array(sub));
                }
                Value::Dictionary(dest) => {
                    let src = m.pop()?.dict_value()?;
                    let entries: Vec<_> = src.borrow().iter().cloned().collect();
                    let mut dest_dict = dest.borrow_mut();
                    for (k, v) in entries {
                        dest_dict.add(k, v);
                    }
                    drop(dest_dict);
                    m.push(top.clone());
                }
                Value::String(dest) => {
                    let src = m.pop()?.string_value()?;
                    let src = src.bytes()?.clone();
                    let mut dest_bytes = dest.bytes_mut()?;
                    if src.len() > dest_bytes.len() {
                        return Err(MachineError::RangeCheck);
                    }
                    dest_bytes[..src.len()].copy_from_slice(&src);
                    drop(dest_bytes);
                    m.push(Operand::string(crate::operand::PsString::literal(src)));
                }
                _ => return Err(MachineError::TypeCheck),
            }
            Ok(())
        },
        // any(n) ... any0 n index -> any(n) ... any0 any(n)
        "index" => |m| {
            let index = m.pop_count()?;
            m.push(m.operand_stack().peek(index)?.clone());
            Ok(())
        },
        // a(n-1) ... a0 n j roll -> a((j-1) mod n) ... a0 a(n-1) ... a(j mod n)
        "roll" => |m| {
            let j = m.pop_int()?;
            let n = m.pop_count()?;
            if n == 0 {
                return Ok(());
            }
            let mut items = m.pop_n(n)?;
            let n_i = i64::try_from(n).map_err(|_| MachineError::RangeCheck)?;
            let shift = usize::try_from(i64::from(j).rem_euclid(n_i))
                .map_err(|_| MachineError::RangeCheck)?;
            items.rotate_right(shift);
            for item in items {
                m.push(item);
            }
            Ok(())
        },
        // | any1 ... any(n) clear |
        "clear" => |m| {
            m.operands.clear();
            Ok(())
        },
        // | any1 ... any(n) count | any1 ... any(n) n
        "count" => |m| {
            let n = Operand::from_len(m.operands.len())?;
            m.push(n);
            Ok(())
        },
        // - mark -> mark
        "mark" => |m| {
            m.push(Operand::mark());
            Ok(())
        },
        // mark obj1 .. obj(n) cleartomark -> -
        "cleartomark" => |m| {
            m.pop_to_mark()?;
            Ok(())
        },
        // mark obj1 .. obj(n) counttomark -> mark obj1 .. obj(n) n
        "counttomark" => |m| {
            let n = Operand::from_len(m.count_to_mark()?)?;
            m.push(n);
            Ok(())
        },
    );
}
