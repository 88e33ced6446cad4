use super::built_in_ops;
use crate::{
    decode::decode_number_array,
    dictionary::EpsDictionary,
    graphics::{
        path::arc_to_curves,
        trans::{DeviceRect, UserPoint, UserVector},
        FillRule, GraphicsState, PathGeometry,
    },
    machine::Machine,
    operand::Value,
    MachineError, MachineResult,
};

/// User space rectangle `x y width height`.
pub(super) type UserRect = [f64; 4];

/// Pop operands of `rectfill`, `rectstroke` and `rectclip`: four numbers,
/// an array of numbers, or an encoded number string.
pub(super) fn pop_rects(m: &mut Machine) -> MachineResult<Vec<UserRect>> {
    let top = m.pop()?;
    let numbers = match top.value() {
        Value::Integer(_) | Value::Real(_) => {
            let h = top.real()?;
            let w = m.pop_real()?;
            let (x, y) = m.pop_xy()?;
            return Ok(vec![[x, y, w, h]]);
        }
        Value::Array(_) | Value::Procedure(_) => top.numbers()?,
        Value::String(s) => decode_number_array(&s.bytes()?)?,
        _ => return Err(MachineError::TypeCheck),
    };
    if numbers.len() % 4 != 0 {
        return Err(MachineError::RangeCheck);
    }
    Ok(numbers
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect())
}

/// Append closed rectangles, mapped to device space.
pub(super) fn rect_path(gs: &GraphicsState, rects: &[UserRect]) -> PathGeometry {
    let mut path = PathGeometry::new();
    for &[x, y, w, h] in rects {
        path.move_to(gs.to_device(UserPoint::new(x, y)));
        path.line_to(gs.to_device(UserPoint::new(x + w, y)));
        path.line_to(gs.to_device(UserPoint::new(x + w, y + h)));
        path.line_to(gs.to_device(UserPoint::new(x, y + h)));
        path.close();
    }
    path
}

fn arc(m: &mut Machine, clockwise: bool) -> MachineResult<()> {
    let a2 = m.pop_real()?;
    let a1 = m.pop_real()?;
    let r = m.pop_real()?;
    let (x, y) = m.pop_xy()?;
    if ![x, y, r, a1, a2].iter().all(|v| v.is_finite()) {
        return Err(MachineError::RangeCheck);
    }
    let gs = m.gs_mut();
    let (start, curves) = arc_to_curves(UserPoint::new(x, y), r, a1, a2, clockwise, gs.user_to_device());
    let has_current = gs.current_point().is_some();
    let path = gs.path_mut();
    if has_current {
        path.line_to(start);
    } else {
        path.move_to(start);
    }
    let mut last = start;
    for [p1, p2, p3] in curves {
        path.curve_to(p1, p2, p3);
        last = p3;
    }
    gs.set_current_point(Some(last));
    Ok(())
}

fn clip(m: &mut Machine, rule: FillRule) -> MachineResult<()> {
    let gs = m.gs_mut();
    let path = gs.path().clone().with_fill_rule(rule);
    gs.push_clip(path);
    Ok(())
}

/// Device space area painting is limited to.
pub(super) fn clip_bounds(m: &Machine) -> DeviceRect {
    m.gs()
        .clip()
        .last()
        .and_then(|c| c.bounds())
        .unwrap_or_else(|| m.device_page_rect())
}

pub(super) fn register(d: &mut EpsDictionary, level: u8) {
    built_in_ops!(d;
        "newpath" => |m| {
            m.gs_mut().take_path();
            Ok(())
        },
        // x y moveto -
        "moveto" => |m| {
            let (x, y) = m.pop_xy()?;
            let gs = m.gs_mut();
            let p = gs.to_device(UserPoint::new(x, y));
            gs.path_mut().move_to(p);
            gs.set_current_point(Some(p));
            Ok(())
        },
        "rmoveto" => |m| {
            let (x, y) = m.pop_xy()?;
            let gs = m.gs_mut();
            let p = gs.require_current_point()? + gs.user_vector_to_device(UserVector::new(x, y));
            gs.path_mut().move_to(p);
            gs.set_current_point(Some(p));
            Ok(())
        },
        // x y lineto -
        "lineto" => |m| {
            let (x, y) = m.pop_xy()?;
            let gs = m.gs_mut();
            gs.require_current_point()?;
            let p = gs.to_device(UserPoint::new(x, y));
            gs.path_mut().line_to(p);
            gs.set_current_point(Some(p));
            Ok(())
        },
        "rlineto" => |m| {
            let (x, y) = m.pop_xy()?;
            let gs = m.gs_mut();
            let p = gs.require_current_point()? + gs.user_vector_to_device(UserVector::new(x, y));
            gs.path_mut().line_to(p);
            gs.set_current_point(Some(p));
            Ok(())
        },
        // x1 y1 x2 y2 x3 y3 curveto -
        "curveto" => |m| {
            let (x3, y3) = m.pop_xy()?;
            let (x2, y2) = m.pop_xy()?;
            let (x1, y1) = m.pop_xy()?;
            let gs = m.gs_mut();
            gs.require_current_point()?;
            let [p1, p2, p3] = [(x1, y1), (x2, y2), (x3, y3)]
                .map(|(x, y)| gs.to_device(UserPoint::new(x, y)));
            gs.path_mut().curve_to(p1, p2, p3);
            gs.set_current_point(Some(p3));
            Ok(())
        },
        "rcurveto" => |m| {
            let (x3, y3) = m.pop_xy()?;
            let (x2, y2) = m.pop_xy()?;
            let (x1, y1) = m.pop_xy()?;
            let gs = m.gs_mut();
            let cp = gs.require_current_point()?;
            let [p1, p2, p3] = [(x1, y1), (x2, y2), (x3, y3)]
                .map(|(x, y)| cp + gs.user_vector_to_device(UserVector::new(x, y)));
            gs.path_mut().curve_to(p1, p2, p3);
            gs.set_current_point(Some(p3));
            Ok(())
        },
        // x y r angle1 angle2 arc -
        "arc" => |m| arc(m, false),
        "arcn" => |m| arc(m, true),
        "closepath" => |m| {
            let gs = m.gs_mut();
            gs.path_mut().close();
            let start = gs.path().last_move_to();
            if start.is_some() {
                gs.set_current_point(start);
            }
            Ok(())
        },
        // - currentpoint -> x y
        "currentpoint" => |m| {
            let gs = m.gs();
            let p = gs.to_user(gs.require_current_point()?)?;
            m.push(p.x);
            m.push(p.y);
            Ok(())
        },
        // - pathbbox -> llx lly urx ury
        "pathbbox" => |m| {
            let gs = m.gs();
            let bounds = gs.path().bounds().ok_or(MachineError::NoCurrentPoint)?;
            let inverse = gs.user_to_device().inverse().ok_or(MachineError::UndefinedResult)?;
            let r = inverse.outer_transformed_box(&bounds);
            for v in [r.min.x, r.min.y, r.max.x, r.max.y] {
                m.push(v);
            }
            Ok(())
        },
        // replace current path with the clip path
        "clippath" => |m| {
            let bounds = clip_bounds(m);
            let path = match m.gs().clip().last() {
                Some(c) => (**c).clone(),
                None => PathGeometry::rect(&bounds),
            };
            let gs = m.gs_mut();
            let start = path.last_move_to();
            *gs.path_mut() = path;
            gs.set_current_point(start);
            Ok(())
        },
        "initclip" => |m| {
            m.gs_mut().init_clip();
            Ok(())
        },
        "clip" => |m| clip(m, FillRule::NonZero),
        "eoclip" => |m| clip(m, FillRule::EvenOdd),
    );

    if level >= 2 {
        built_in_ops!(d;
            // x y width height rectclip -
            // numarray|numstring rectclip -
            "rectclip" => |m| {
                let rects = pop_rects(m)?;
                let gs = m.gs_mut();
                let path = rect_path(gs, &rects);
                gs.push_clip(path);
                gs.take_path();
                Ok(())
            },
        );
    }
}
