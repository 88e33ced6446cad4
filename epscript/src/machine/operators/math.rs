use super::built_in_ops;
use crate::{
    dictionary::EpsDictionary,
    machine::Machine,
    operand::{Operand, Value},
    MachineError, MachineResult,
};
use either::Either;

/// Pop two numbers, integer result if both are integers and `int_op` does
/// not overflow.
fn binary_arith(
    m: &mut Machine,
    int_op: fn(i32, i32) -> Option<i32>,
    real_op: fn(f64, f64) -> f64,
) -> MachineResult<()> {
    let b = m.pop()?.number()?;
    let a = m.pop()?.number()?;
    let r = match (a, b) {
        (Either::Left(a), Either::Left(b)) => match int_op(a, b) {
            Some(v) => Operand::from(v),
            None => real_op(f64::from(a), f64::from(b)).into(),
        },
        (a, b) => real_op(to_real(a), to_real(b)).into(),
    };
    m.push(r);
    Ok(())
}

fn to_real(v: Either<i32, f64>) -> f64 {
    v.map_left(f64::from).into_inner()
}

/// Unary operator keeping integers as is, `f` applied to reals.
fn unary_round(m: &mut Machine, f: fn(f64) -> f64) -> MachineResult<()> {
    let v = m.pop()?.number()?;
    m.push(v.map_right(f));
    Ok(())
}

fn unary_real(m: &mut Machine, f: fn(f64) -> f64) -> MachineResult<()> {
    let v = m.pop_real()?;
    m.push(check_result(f(v))?);
    Ok(())
}

fn check_result(v: f64) -> MachineResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MachineError::UndefinedResult)
    }
}

/// Pop two ints or two bools.
fn bool_or_bit(
    m: &mut Machine,
    bool_op: fn(bool, bool) -> bool,
    int_op: fn(i32, i32) -> i32,
) -> MachineResult<()> {
    let b = m.pop()?;
    let a = m.pop()?;
    match (a.value(), b.value()) {
        (Value::Bool(a), Value::Bool(b)) => m.push(bool_op(*a, *b)),
        (Value::Integer(a), Value::Integer(b)) => m.push(int_op(*a, *b)),
        _ => return Err(MachineError::TypeCheck),
    }
    Ok(())
}

fn compare(m: &mut Machine, f: fn(&Operand, &Operand) -> MachineResult<bool>) -> MachineResult<()> {
    let b = m.pop()?;
    let a = m.pop()?;
    m.push(f(&a, &b)?);
    Ok(())
}

pub(super) fn register(d: &mut EpsDictionary) {
    built_in_ops!(d;
        // num1 num2 add -> sum
        "add" => |m| binary_arith(m, i32::checked_add, |a, b| a + b),
        // num1 num2 sub -> difference
        "sub" => |m| binary_arith(m, i32::checked_sub, |a, b| a - b),
        // num1 num2 mul -> product
        "mul" => |m| binary_arith(m, i32::checked_mul, |a, b| a * b),
        // num1 num2 div -> quotient, always real
        "div" => |m| {
            let b = m.pop_real()?;
            let a = m.pop_real()?;
            if b == 0.0 {
                return Err(MachineError::UndefinedResult);
            }
            m.push(a / b);
            Ok(())
        },
        // int1 int2 idiv -> quotient
        "idiv" => |m| {
            let b = m.pop_int()?;
            let a = m.pop_int()?;
            m.push(a.checked_div(b).ok_or(MachineError::UndefinedResult)?);
            Ok(())
        },
        // int1 int2 mod -> remainder
        "mod" => |m| {
            let b = m.pop_int()?;
            let a = m.pop_int()?;
            m.push(a.checked_rem(b).ok_or(MachineError::UndefinedResult)?);
            Ok(())
        },
        // num abs -> num
        "abs" => |m| {
            let v = m.pop()?.number()?;
            m.push(match v {
                Either::Left(i) => i.checked_abs().map_or_else(|| Operand::from(f64::from(i).abs()), Operand::from),
                Either::Right(r) => r.abs().into(),
            });
            Ok(())
        },
        // num neg -> -num
        "neg" => |m| {
            let v = m.pop()?.number()?;
            m.push(match v {
                Either::Left(i) => i.checked_neg().map_or_else(|| Operand::from(-f64::from(i)), Operand::from),
                Either::Right(r) => (-r).into(),
            });
            Ok(())
        },
        "ceiling" => |m| unary_round(m, f64::ceil),
        "floor" => |m| unary_round(m, f64::floor),
        // round half up
        "round" => |m| unary_round(m, |v| (v + 0.5).floor()),
        "truncate" => |m| unary_round(m, f64::trunc),
        "sqrt" => |m| unary_real(m, f64::sqrt),
        // num den atan -> angle in degrees, [0, 360)
        "atan" => |m| {
            let den = m.pop_real()?;
            let num = m.pop_real()?;
            if num == 0.0 && den == 0.0 {
                return Err(MachineError::UndefinedResult);
            }
            let mut a = num.atan2(den).to_degrees();
            if a < 0.0 {
                a += 360.0;
            }
            m.push(a);
            Ok(())
        },
        // angle cos -> real, angle in degrees
        "cos" => |m| unary_real(m, |v| v.to_radians().cos()),
        "sin" => |m| unary_real(m, |v| v.to_radians().sin()),
        // base exponent exp -> real
        "exp" => |m| {
            let e = m.pop_real()?;
            let b = m.pop_real()?;
            m.push(check_result(b.powf(e))?);
            Ok(())
        },
        "ln" => |m| unary_real(m, f64::ln),
        "log" => |m| unary_real(m, f64::log10),
        // num cvi -> int, string converted first
        "cvi" => |m| {
            let v = m.pop()?;
            let r = match v.value() {
                Value::String(s) => s.text()?.trim().parse::<f64>().map_err(|_| MachineError::TypeCheck)?,
                _ => v.real()?,
            };
            let r = r.trunc();
            if r < f64::from(i32::MIN) || r > f64::from(i32::MAX) {
                return Err(MachineError::RangeCheck);
            }
            #[allow(clippy::cast_possible_truncation)]
            let r = r as i32;
            m.push(r);
            Ok(())
        },
        // num cvr -> real
        "cvr" => |m| {
            let v = m.pop()?;
            let r = match v.value() {
                Value::String(s) => s.text()?.trim().parse::<f64>().map_err(|_| MachineError::TypeCheck)?,
                _ => v.real()?,
            };
            m.push(r);
            Ok(())
        },
        // int1 shift bitshift -> int2
        "bitshift" => |m| {
            let shift = m.pop_int()?;
            let v = m.pop_int()?;
            let r = if shift >= 0 {
                v.checked_shl(shift.unsigned_abs()).unwrap_or(0)
            } else {
                v.checked_shr(shift.unsigned_abs()).unwrap_or(0)
            };
            m.push(r);
            Ok(())
        },

        // any1 any2 eq -> bool
        "eq" => |m| compare(m, Operand::try_eq),
        "ne" => |m| compare(m, |a, b| a.try_eq(b).map(|v| !v)),
        "gt" => |m| compare(m, Operand::try_gt),
        "ge" => |m| compare(m, |a, b| a.try_lt(b).map(|v| !v)),
        "lt" => |m| compare(m, Operand::try_lt),
        "le" => |m| compare(m, |a, b| a.try_gt(b).map(|v| !v)),
        // bool1 bool2 and -> bool3, int1 int2 and -> int3
        "and" => |m| bool_or_bit(m, |a, b| a && b, |a, b| a & b),
        "or" => |m| bool_or_bit(m, |a, b| a || b, |a, b| a | b),
        "xor" => |m| bool_or_bit(m, |a, b| a ^ b, |a, b| a ^ b),
        // bool not -> bool, int not -> int
        "not" => |m| {
            let v = m.pop()?;
            match v.value() {
                Value::Bool(b) => m.push(!b),
                Value::Integer(i) => m.push(!i),
                _ => return Err(MachineError::TypeCheck),
            }
            Ok(())
        },
        "true" => |m| {
            m.push(true);
            Ok(())
        },
        "false" => |m| {
            m.push(false);
            Ok(())
        },
        "null" => |m| {
            m.push(Operand::null());
            Ok(())
        },
    );
}
