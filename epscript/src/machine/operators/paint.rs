use super::{
    built_in_ops,
    path::{clip_bounds, pop_rects, rect_path, UserRect},
};
use crate::{
    dictionary::EpsDictionary,
    graphics::{trans::UserToUserSpace, FillRule, PathGeometry},
    machine::Machine,
    operand::Operand,
    MachineError, MachineResult,
};

/// Paint rectangles, current path and current point are kept.
fn paint_rects(m: &mut Machine, rects: &[UserRect], fill: Option<FillRule>, stroke: bool) {
    let geometry = rect_path(m.gs(), rects);
    let gs = m.gs_mut();
    let saved = std::mem::replace(gs.path_mut(), geometry);
    let current_point = gs.current_point();
    m.paint(fill, stroke);
    let gs = m.gs_mut();
    *gs.path_mut() = saved;
    gs.set_current_point(current_point);
}

/// Run form `PaintProc` with form matrix and bounding box clip.
fn exec_form(m: &mut Machine, form: Operand) -> MachineResult<()> {
    let (matrix, bbox, paint_proc) = {
        let d = form.dict_value()?;
        let d = d.borrow();
        let matrix: UserToUserSpace = match d.get_by_name("Matrix") {
            Some(v) => v.try_into()?,
            None => UserToUserSpace::identity(),
        };
        let bbox = d.find_by_name("BBox")?.numbers()?;
        let [x0, y0, x1, y1] = bbox[..] else {
            return Err(MachineError::RangeCheck);
        };
        let paint_proc = d.find_by_name("PaintProc")?.clone();
        (matrix, [x0, y0, x1 - x0, y1 - y0], paint_proc)
    };

    m.graphics.push();
    let gs = m.gs_mut();
    gs.concat_ctm(&matrix);
    let clip = rect_path(gs, &[bbox]);
    gs.push_clip(clip);
    gs.take_path();
    m.push(form);
    let r = m.execute_object(paint_proc);
    m.graphics.pop()?;
    r
}

pub(super) fn register(d: &mut EpsDictionary, level: u8) {
    built_in_ops!(d;
        "fill" => |m| {
            m.paint(Some(FillRule::NonZero), false);
            Ok(())
        },
        "eofill" => |m| {
            m.paint(Some(FillRule::EvenOdd), false);
            Ok(())
        },
        "stroke" => |m| {
            m.paint(None, true);
            Ok(())
        },
    );

    if level >= 2 {
        built_in_ops!(d;
            // x y width height rectfill -
            // numarray|numstring rectfill -
            "rectfill" => |m| {
                let rects = pop_rects(m)?;
                paint_rects(m, &rects, Some(FillRule::NonZero), false);
                Ok(())
            },
            "rectstroke" => |m| {
                let rects = pop_rects(m)?;
                paint_rects(m, &rects, None, true);
                Ok(())
            },
            // form execform -
            "execform" => |m| {
                let form = m.pop()?;
                exec_form(m, form)
            },
        );
    }

    if level >= 3 {
        built_in_ops!(d;
            // shading shfill -
            "shfill" => |m| {
                let shading = m.pop()?.dict_value()?;
                let bounds = clip_bounds(m);
                let to_device = *m.gs().user_to_device();
                let manager = m.shading_manager();
                let (brush, precision) = manager.resolve(m, &shading, &to_device, &bounds)?;
                m.paint_with(PathGeometry::rect(&bounds), brush, precision);
                Ok(())
            },
        );
    }
}
