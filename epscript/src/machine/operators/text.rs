//! Font and text operators. Glyphs are not drawn, only the font and the
//! current point are maintained, each glyph advances half an em.

use super::built_in_ops;
use crate::{
    decode::decode_number_array,
    dictionary::EpsDictionary,
    graphics::{
        matrix_operand,
        trans::{UserSpace, UserVector},
    },
    machine::Machine,
    operand::{Operand, Value},
    MachineResult,
};
use euclid::Transform2D;
use log::debug;

enum GlyphSpace {}
type FontMatrix = Transform2D<f64, GlyphSpace, UserSpace>;

/// Glyph advance in glyph space units.
const ADVANCE: f64 = 500.0;

fn stub_font(name: crate::Name) -> Operand {
    let mut d = EpsDictionary::new();
    d.add("FontName".into(), Operand::from(name));
    d.add("FontType".into(), 3.into());
    d.add(
        "FontMatrix".into(),
        matrix_operand(&FontMatrix::scale(0.001, 0.001)),
    );
    Operand::new_dict(d)
}

fn font_matrix(font: &Operand) -> MachineResult<FontMatrix> {
    match font.dict_value()?.borrow().get_by_name("FontMatrix") {
        Some(v) => v.try_into(),
        None => Ok(FontMatrix::scale(0.001, 0.001)),
    }
}

/// Copy of `font` with font matrix replaced.
fn with_font_matrix(font: &Operand, matrix: &FontMatrix) -> MachineResult<Operand> {
    let mut d = font.dict_value()?.borrow().clone();
    d.add("FontMatrix".into(), matrix_operand(matrix));
    Ok(Operand::new_dict(d))
}

pub(super) fn find_font(m: &Machine, key: &Operand) -> Operand {
    if let Some(font) = m.dicts.font.borrow().get(key) {
        return font.clone();
    }
    let name = key.text().map_or_else(|_| crate::sname("Courier"), |t| crate::name(&t));
    debug!("font {name} not found, use stub font");
    stub_font(name)
}

fn current_font_matrix(m: &Machine) -> MachineResult<FontMatrix> {
    match m.gs().font() {
        Some(font) => font_matrix(font),
        None => Ok(FontMatrix::scale(0.001, 0.001)),
    }
}

/// Move current point by `glyphs` glyph advances plus `extra` user space
/// displacement.
fn advance(m: &mut Machine, glyphs: usize, extra: UserVector) -> MachineResult<()> {
    let matrix = current_font_matrix(m)?;
    let gs = m.gs_mut();
    let p = gs.require_current_point()?;
    let per_glyph = matrix.transform_vector(euclid::Vector2D::new(ADVANCE, 0.0));
    #[allow(clippy::cast_precision_loss)]
    let v = per_glyph * glyphs as f64 + extra;
    gs.set_current_point(Some(p + gs.user_vector_to_device(v)));
    Ok(())
}

fn pop_text_len(m: &mut Machine) -> MachineResult<usize> {
    Ok(m.pop()?.string_value()?.bytes()?.len())
}

/// Displacements of `xshow` family: array or encoded number string.
fn pop_displacements(m: &mut Machine) -> MachineResult<Vec<f64>> {
    let v = m.pop()?;
    match v.value() {
        Value::String(s) => Ok(decode_number_array(&s.bytes()?)?),
        _ => v.numbers(),
    }
}

/// `widthshow` extra displacement for occurrences of `ch`.
fn count_char(text: &[u8], ch: i32) -> usize {
    text.iter().filter(|b| i32::from(**b) == ch).count()
}

#[allow(clippy::cast_precision_loss)]
fn scaled(v: UserVector, n: usize) -> UserVector {
    v * n as f64
}

pub(super) fn register(d: &mut EpsDictionary, level: u8) {
    built_in_ops!(d;
        // key findfont -> font
        "findfont" => |m| {
            let key = m.pop()?;
            let font = find_font(m, &key);
            m.push(font);
            Ok(())
        },
        // font scale scalefont -> font'
        "scalefont" => |m| {
            let scale = m.pop_real()?;
            let font = m.pop()?;
            let matrix = font_matrix(&font)?.then_scale(scale, scale);
            m.push(with_font_matrix(&font, &matrix)?);
            Ok(())
        },
        // font matrix makefont -> font'
        "makefont" => |m| {
            let t: Transform2D<f64, UserSpace, UserSpace> = (&m.pop()?).try_into()?;
            let font = m.pop()?;
            let matrix = font_matrix(&font)?.then(&t);
            m.push(with_font_matrix(&font, &matrix)?);
            Ok(())
        },
        "setfont" => |m| {
            let font = m.pop()?;
            font.dict_value()?;
            m.gs_mut().set_font(font);
            Ok(())
        },
        "currentfont" => |m| {
            let font = m
                .gs()
                .font()
                .cloned()
                .unwrap_or_else(|| stub_font(crate::sname("Courier")));
            m.push(font);
            Ok(())
        },
        // key font definefont -> font
        "definefont" => |m| {
            let font = m.pop()?;
            let key = m.pop()?;
            font.dict_value()?;
            m.dicts.font.borrow_mut().add(key, font.clone());
            m.push(font);
            Ok(())
        },
        // string show -
        "show" => |m| {
            let n = pop_text_len(m)?;
            advance(m, n, UserVector::zero())
        },
        // ax ay string ashow -
        "ashow" => |m| {
            let n = pop_text_len(m)?;
            let (ax, ay) = m.pop_xy()?;
            advance(m, n, scaled(UserVector::new(ax, ay), n))
        },
        // cx cy char string widthshow -
        "widthshow" => |m| {
            let s = m.pop()?.string_value()?;
            let ch = m.pop_int()?;
            let (cx, cy) = m.pop_xy()?;
            let text = s.bytes()?.clone();
            advance(m, text.len(), scaled(UserVector::new(cx, cy), count_char(&text, ch)))
        },
        // cx cy char ax ay string awidthshow -
        "awidthshow" => |m| {
            let s = m.pop()?.string_value()?;
            let (ax, ay) = m.pop_xy()?;
            let ch = m.pop_int()?;
            let (cx, cy) = m.pop_xy()?;
            let text = s.bytes()?.clone();
            let extra = scaled(UserVector::new(cx, cy), count_char(&text, ch))
                + scaled(UserVector::new(ax, ay), text.len());
            advance(m, text.len(), extra)
        },
        // string numarray|numstring xshow -
        "xshow" => |m| {
            let dx = pop_displacements(m)?;
            pop_text_len(m)?;
            advance(m, 0, UserVector::new(dx.iter().sum(), 0.0))
        },
        "yshow" => |m| {
            let dy = pop_displacements(m)?;
            pop_text_len(m)?;
            advance(m, 0, UserVector::new(0.0, dy.iter().sum()))
        },
        "xyshow" => |m| {
            let d = pop_displacements(m)?;
            pop_text_len(m)?;
            let v = d
                .chunks_exact(2)
                .fold(UserVector::zero(), |acc, c| acc + UserVector::new(c[0], c[1]));
            advance(m, 0, v)
        },
        // string stringwidth -> wx wy
        "stringwidth" => |m| {
            let n = pop_text_len(m)?;
            let matrix = current_font_matrix(m)?;
            #[allow(clippy::cast_precision_loss)]
            let v = matrix.transform_vector(euclid::Vector2D::new(ADVANCE, 0.0)) * n as f64;
            m.push(v.x);
            m.push(v.y);
            Ok(())
        },
        // string bool charpath -
        "charpath" => |m| {
            m.pop_bool()?;
            let n = pop_text_len(m)?;
            debug!("charpath: glyph outlines not available");
            advance(m, n, UserVector::zero())
        },
    );

    if level >= 2 {
        built_in_ops!(d;
            // key scale|matrix selectfont -
            "selectfont" => |m| {
                let size = m.pop()?;
                let key = m.pop()?;
                let font = find_font(m, &key);
                let matrix = font_matrix(&font)?;
                let matrix = match size.value() {
                    Value::Integer(_) | Value::Real(_) => {
                        let s = size.real()?;
                        matrix.then_scale(s, s)
                    }
                    _ => {
                        let t: Transform2D<f64, UserSpace, UserSpace> = (&size).try_into()?;
                        matrix.then(&t)
                    }
                };
                let font = with_font_matrix(&font, &matrix)?;
                m.gs_mut().set_font(font);
                Ok(())
            },
        );
    }
}
