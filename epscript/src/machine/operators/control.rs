use super::built_in_ops;
use crate::{
    dictionary::EpsDictionary,
    machine::Machine,
    operand::{Command, Operand, PsString},
    MachineError, MachineResult,
};
use either::Either;

fn pop_procedure(m: &mut Machine) -> MachineResult<crate::operand::ArrayRef> {
    m.pop()?.procedure_value()
}

/// `for` with integer control variable, stays integer as long as all three
/// operands are integers.
fn for_int(m: &mut Machine, initial: i32, increment: i32, limit: i32, proc: &Operand) -> MachineResult<()> {
    let mut i = initial;
    loop {
        if (increment >= 0 && i > limit) || (increment < 0 && i < limit) {
            break;
        }
        m.push(i);
        m.execute_object(proc.clone())?;
        if m.break_current_loop() {
            break;
        }
        match i.checked_add(increment) {
            Some(v) => i = v,
            None => break,
        }
    }
    Ok(())
}

fn for_real(m: &mut Machine, initial: f64, increment: f64, limit: f64, proc: &Operand) -> MachineResult<()> {
    let mut i = initial;
    loop {
        if (increment >= 0.0 && i > limit) || (increment < 0.0 && i < limit) {
            break;
        }
        m.push(i);
        m.execute_object(proc.clone())?;
        if m.break_current_loop() {
            break;
        }
        i += increment;
    }
    Ok(())
}

pub(super) fn register(d: &mut EpsDictionary, level: u8) {
    // executed even while a procedure is being built
    d.add_command(Command::always("{", |m| {
        m.push(Operand::mark());
        m.procedure_creation_level += 1;
        Ok(())
    }));
    d.add_command(Command::always("}", |m| {
        if m.procedure_creation_level == 0 {
            return Err(MachineError::SyntaxError);
        }
        m.procedure_creation_level -= 1;
        let items = m.pop_to_mark()?;
        m.push(Operand::procedure(items));
        Ok(())
    }));

    built_in_ops!(d;
        // any exec -
        "exec" => |m| {
            let v = m.pop()?;
            m.execute_object(v)
        },
        // bool proc if -
        "if" => |m| {
            let proc = pop_procedure(m)?;
            if m.pop_bool()? {
                m.execute_procedure(&proc)?;
            }
            Ok(())
        },
        // bool proc1 proc2 ifelse -
        "ifelse" => |m| {
            let proc2 = pop_procedure(m)?;
            let proc1 = pop_procedure(m)?;
            let proc = if m.pop_bool()? { proc1 } else { proc2 };
            m.execute_procedure(&proc)
        },
        // initial increment limit proc for -
        "for" => |m| {
            let proc = m.pop()?;
            check_procedure(&proc)?;
            let limit = m.pop()?.number()?;
            let increment = m.pop()?.number()?;
            let initial = m.pop()?.number()?;
            let r = match (initial, increment, limit) {
                (Either::Left(a), Either::Left(b), Either::Left(c)) => for_int(m, a, b, c, &proc),
                (a, b, c) => {
                    let real = |v: Either<i32, f64>| v.map_left(f64::from).into_inner();
                    for_real(m, real(a), real(b), real(c), &proc)
                }
            };
            m.end_loop();
            r
        },
        // int proc repeat -
        "repeat" => |m| {
            let proc = m.pop()?;
            check_procedure(&proc)?;
            let n = m.pop_int()?;
            if n < 0 {
                return Err(MachineError::RangeCheck);
            }
            for _ in 0..n {
                m.execute_object(proc.clone())?;
                if m.break_current_loop() {
                    break;
                }
            }
            m.end_loop();
            Ok(())
        },
        // proc loop -
        "loop" => |m| {
            let proc = m.pop()?;
            check_procedure(&proc)?;
            loop {
                m.execute_object(proc.clone())?;
                if m.break_current_loop() {
                    break;
                }
            }
            m.end_loop();
            Ok(())
        },
        "exit" => |m| {
            m.exit_loop = true;
            Ok(())
        },
        "stop" => |m| m.stop(),
        // any stopped -> bool
        "stopped" => |m| {
            let proc = m.pop()?;
            let stopped = m.stopped(proc)?;
            m.push(stopped);
            Ok(())
        },
        "quit" => |m| {
            m.quit = true;
            Ok(())
        },
        "countexecstack" => |m| {
            let n = Operand::from_len(m.depth + 1)?;
            m.push(n);
            Ok(())
        },
        "version" => |m| {
            m.push(PsString::literal("3010"));
            Ok(())
        },
        "product" => |m| {
            m.push(PsString::literal(env!("CARGO_PKG_NAME")));
            Ok(())
        },
        "currentfile" => |m| {
            m.push(Operand::file(crate::sname("%stdin")));
            Ok(())
        },
        // file closefile -
        "closefile" => |m| {
            let f = m.pop()?;
            if !matches!(f.value(), crate::operand::Value::File(_)) {
                return Err(MachineError::TypeCheck);
            }
            m.file_closed = true;
            Ok(())
        },
    );

    if level >= 2 {
        built_in_ops!(d;
            "languagelevel" => |m| {
                m.push(i32::from(m.option.level()));
                Ok(())
            },
        );
    }
}

fn check_procedure(proc: &Operand) -> MachineResult<()> {
    proc.procedure_value().map(|_| ())
}
