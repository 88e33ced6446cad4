use super::built_in_ops;
use crate::{
    dictionary::EpsDictionary,
    graphics::{
        matrix_operand,
        trans::{PageSpace, UserPoint, UserSpace, UserToPageSpace, UserToUserSpace, UserVector},
        LineCapStyle, LineJoinStyle,
    },
    machine::Machine,
    operand::{Operand, Value},
    MachineError, MachineResult,
};
use euclid::{Angle, Transform2D};
use log::info;

/// Overwrite the 6 elements of matrix operand `v`.
fn store_matrix<S, T>(v: &Operand, t: &Transform2D<f64, S, T>) -> MachineResult<()> {
    let a = v.array_like()?;
    let mut a = a.borrow_mut();
    if a.len() != 6 {
        return Err(MachineError::RangeCheck);
    }
    for (d, s) in a.iter_mut().zip(t.to_array()) {
        *d = s.into();
    }
    Ok(())
}

/// Pop optional trailing matrix operand.
fn pop_opt_matrix(m: &mut Machine) -> MachineResult<Option<Operand>> {
    let is_matrix = matches!(m.top()?.value(), Value::Array(_) | Value::Procedure(_));
    is_matrix.then(|| m.pop()).transpose()
}

/// Shared by `translate`, `scale` and `rotate`: concat to CTM, or store in
/// the matrix operand if given.
fn apply_transform(m: &mut Machine, t: UserToUserSpace, matrix: Option<Operand>) -> MachineResult<()> {
    match matrix {
        Some(matrix) => {
            store_matrix(&matrix, &t)?;
            m.push(matrix);
        }
        None => m.gs_mut().concat_ctm(&t),
    }
    Ok(())
}

fn ctm_or(m: &mut Machine) -> MachineResult<UserToPageSpace> {
    match pop_opt_matrix(m)? {
        Some(v) => (&v).try_into(),
        None => Ok(*m.gs().ctm()),
    }
}

fn inverse(t: &UserToPageSpace) -> MachineResult<Transform2D<f64, PageSpace, UserSpace>> {
    t.inverse().ok_or(MachineError::UndefinedResult)
}

/// `save` level, an integer save object.
fn save(m: &mut Machine) -> MachineResult<()> {
    let level = i32::try_from(m.saves.len() + 1).map_err(|_| MachineError::LimitCheck)?;
    m.saves.push(m.dict_stack.len());
    m.graphics.push_save(level);
    m.push(level);
    Ok(())
}

fn restore(m: &mut Machine) -> MachineResult<()> {
    let level = m.pop_int()?;
    let idx = level
        .checked_sub(1)
        .and_then(|l| usize::try_from(l).ok())
        .ok_or(MachineError::InvalidRestore)?;
    let Some(depth) = m.saves.get(idx).copied() else {
        return Err(MachineError::InvalidRestore);
    };
    m.graphics.restore(level)?;
    m.saves.truncate(idx);
    m.dict_stack.truncate(depth.max(3));
    Ok(())
}

pub(super) fn register(d: &mut EpsDictionary, level: u8) {
    built_in_ops!(d;
        // - save -> save
        "save" => save,
        // save restore -
        "restore" => restore,
        "gsave" => |m| {
            m.graphics.push();
            Ok(())
        },
        "grestore" => |m| m.graphics.pop(),
        "grestoreall" => |m| {
            m.graphics.pop_all();
            Ok(())
        },
        "setlinewidth" => |m| {
            let w = m.pop_real()?;
            m.gs_mut().set_line_width(w.abs());
            Ok(())
        },
        "currentlinewidth" => |m| {
            m.push(m.gs().line_width());
            Ok(())
        },
        "setlinecap" => |m| {
            let cap = LineCapStyle::try_from(m.pop_int()?)?;
            m.gs_mut().set_line_cap(cap);
            Ok(())
        },
        "currentlinecap" => |m| {
            m.push(m.gs().line_cap() as i32);
            Ok(())
        },
        "setlinejoin" => |m| {
            let join = LineJoinStyle::try_from(m.pop_int()?)?;
            m.gs_mut().set_line_join(join);
            Ok(())
        },
        "currentlinejoin" => |m| {
            m.push(m.gs().line_join() as i32);
            Ok(())
        },
        "setmiterlimit" => |m| {
            let limit = m.pop_real()?;
            if limit < 1.0 {
                return Err(MachineError::RangeCheck);
            }
            m.gs_mut().set_miter_limit(limit);
            Ok(())
        },
        "currentmiterlimit" => |m| {
            m.push(m.gs().miter_limit());
            Ok(())
        },
        // array offset setdash -
        "setdash" => |m| {
            let offset = m.pop_real()?;
            let pattern = m.pop()?.numbers()?;
            if pattern.iter().any(|v| *v < 0.0) {
                return Err(MachineError::RangeCheck);
            }
            m.gs_mut().set_dash(pattern, offset);
            Ok(())
        },
        "currentdash" => |m| {
            let (pattern, offset) = m.gs().dash();
            let pattern = Operand::array(pattern.iter().map(|v| Operand::from(*v)).collect());
            m.push(pattern);
            m.push(offset);
            Ok(())
        },
        "setflat" => |m| {
            let v = m.pop_real()?;
            m.gs_mut().set_flatness(v.clamp(0.2, 100.0));
            Ok(())
        },
        "currentflat" => |m| {
            m.push(m.gs().flatness());
            Ok(())
        },
        "setoverprint" => |m| {
            let v = m.pop_bool()?;
            m.gs_mut().set_overprint(v);
            Ok(())
        },
        ".setopacityalpha" => |m| {
            let v = m.pop_real()?;
            m.gs_mut().set_opacity(v);
            Ok(())
        },
        "showpage" => |_| {
            info!("showpage");
            Ok(())
        },
        "matrix" => |m| {
            m.push(matrix_operand(&UserToUserSpace::identity()));
            Ok(())
        },
        // matrix identmatrix -> matrix
        "identmatrix" => |m| {
            let v = m.pop()?;
            store_matrix(&v, &UserToUserSpace::identity())?;
            m.push(v);
            Ok(())
        },
        "initmatrix" => |m| {
            m.gs_mut().set_ctm(UserToPageSpace::identity());
            Ok(())
        },
        // matrix defaultmatrix -> matrix
        "defaultmatrix" => |m| {
            let v = m.pop()?;
            store_matrix(&v, &UserToPageSpace::identity())?;
            m.push(v);
            Ok(())
        },
        // matrix currentmatrix -> matrix
        "currentmatrix" => |m| {
            let v = m.pop()?;
            store_matrix(&v, m.gs().ctm())?;
            m.push(v);
            Ok(())
        },
        // matrix setmatrix -
        "setmatrix" => |m| {
            let t: UserToPageSpace = (&m.pop()?).try_into()?;
            m.gs_mut().set_ctm(t);
            Ok(())
        },
        // matrix concat -
        "concat" => |m| {
            let t: UserToUserSpace = (&m.pop()?).try_into()?;
            m.gs_mut().concat_ctm(&t);
            Ok(())
        },
        // matrix1 matrix2 matrix3 concatmatrix -> matrix3
        "concatmatrix" => |m| {
            let dest = m.pop()?;
            let b: UserToUserSpace = (&m.pop()?).try_into()?;
            let a: UserToUserSpace = (&m.pop()?).try_into()?;
            store_matrix(&dest, &a.then(&b))?;
            m.push(dest);
            Ok(())
        },
        // tx ty translate -
        // tx ty matrix translate -> matrix
        "translate" => |m| {
            let matrix = pop_opt_matrix(m)?;
            let (x, y) = m.pop_xy()?;
            apply_transform(m, UserToUserSpace::translation(x, y), matrix)
        },
        // sx sy scale -
        // sx sy matrix scale -> matrix
        "scale" => |m| {
            let matrix = pop_opt_matrix(m)?;
            let (x, y) = m.pop_xy()?;
            apply_transform(m, UserToUserSpace::scale(x, y), matrix)
        },
        // angle rotate -
        // angle matrix rotate -> matrix
        "rotate" => |m| {
            let matrix = pop_opt_matrix(m)?;
            let angle = m.pop_real()?;
            apply_transform(m, UserToUserSpace::rotation(Angle::degrees(angle)), matrix)
        },
        // x y transform -> x' y'
        // x y matrix transform -> x' y'
        "transform" => |m| {
            let t = ctm_or(m)?;
            let (x, y) = m.pop_xy()?;
            let p = t.transform_point(UserPoint::new(x, y));
            m.push(p.x);
            m.push(p.y);
            Ok(())
        },
        "itransform" => |m| {
            let t = inverse(&ctm_or(m)?)?;
            let (x, y) = m.pop_xy()?;
            let p = t.transform_point(euclid::Point2D::new(x, y));
            m.push(p.x);
            m.push(p.y);
            Ok(())
        },
        // dx dy dtransform -> dx' dy'
        "dtransform" => |m| {
            let t = ctm_or(m)?;
            let (x, y) = m.pop_xy()?;
            let v = t.transform_vector(UserVector::new(x, y));
            m.push(v.x);
            m.push(v.y);
            Ok(())
        },
        "idtransform" => |m| {
            let t = inverse(&ctm_or(m)?)?;
            let (x, y) = m.pop_xy()?;
            let v = t.transform_vector(euclid::Vector2D::new(x, y));
            m.push(v.x);
            m.push(v.y);
            Ok(())
        },
        // matrix1 matrix2 invertmatrix -> matrix2
        "invertmatrix" => |m| {
            let dest = m.pop()?;
            let t: UserToPageSpace = (&m.pop()?).try_into()?;
            store_matrix(&dest, &inverse(&t)?)?;
            m.push(dest);
            Ok(())
        },
    );

    if level >= 2 {
        built_in_ops!(d;
            "setstrokeadjust" => |m| {
                let v = m.pop_bool()?;
                m.gs_mut().set_stroke_adjust(v);
                Ok(())
            },
            "setglobal" => |m| {
                m.global_allocation = m.pop_bool()?;
                Ok(())
            },
            "currentglobal" => |m| {
                m.push(m.global_allocation);
                Ok(())
            },
            // dict setpagedevice -
            "setpagedevice" => |m| {
                m.pop()?.dict_value()?;
                info!("setpagedevice ignored");
                Ok(())
            },
        );
    }
}
