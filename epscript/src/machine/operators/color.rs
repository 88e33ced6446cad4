use super::built_in_ops;
use crate::{
    dictionary::EpsDictionary,
    graphics::{matrix_operand, trans::{PatternSpace, PatternToPageSpace, UserSpace}, ColorSpace, Rgb},
    machine::Machine,
    operand::Operand,
    MachineError, MachineResult,
};
use euclid::Transform2D;
use std::rc::Rc;

/// Select color space and color, resolving the brush descriptor.
fn set_space_and_color(m: &mut Machine, space: Rc<ColorSpace>, color: Vec<Operand>) -> MachineResult<()> {
    let brush = space.brush_descriptor(m, &color)?;
    m.gs_mut().set_color_space(space, color, brush);
    Ok(())
}

fn set_color(m: &mut Machine, color: Vec<Operand>) -> MachineResult<()> {
    let space = m.gs().color_space().clone();
    let brush = space.brush_descriptor(m, &color)?;
    m.gs_mut().set_color(color, brush);
    Ok(())
}

fn set_device_color(m: &mut Machine, space: ColorSpace) -> MachineResult<()> {
    let color = m.pop_n(space.components())?;
    for c in &color {
        c.real()?;
    }
    set_space_and_color(m, Rc::new(space), color)
}

pub(crate) fn hsb_to_rgb(h: f64, s: f64, v: f64) -> Rgb {
    let h = (h.rem_euclid(1.0)) * 6.0;
    #[allow(clippy::cast_possible_truncation)]
    let sector = h.floor() as i32;
    let f = h - h.floor();
    let p = v * (1.0 - s);
    let q = v * s.mul_add(-f, 1.0);
    let t = v * s.mul_add(f - 1.0, 1.0);
    match sector {
        0 => Rgb::new(v, t, p),
        1 => Rgb::new(q, v, p),
        2 => Rgb::new(p, v, t),
        3 => Rgb::new(p, q, v),
        4 => Rgb::new(t, p, v),
        _ => Rgb::new(v, p, q),
    }
}

pub(crate) fn rgb_to_hsb(c: Rgb) -> [f64; 3] {
    let max = c.r.max(c.g).max(c.b);
    let min = c.r.min(c.g).min(c.b);
    let delta = max - min;
    if max <= 0.0 || delta <= 0.0 {
        return [0.0, 0.0, max];
    }
    let h = if c.r >= max {
        (c.g - c.b) / delta
    } else if c.g >= max {
        2.0 + (c.b - c.r) / delta
    } else {
        4.0 + (c.r - c.g) / delta
    };
    [(h / 6.0).rem_euclid(1.0), delta / max, max]
}

pub(super) fn register(d: &mut EpsDictionary, level: u8) {
    built_in_ops!(d;
        "setgray" => |m| set_device_color(m, ColorSpace::DeviceGray),
        "setrgbcolor" => |m| set_device_color(m, ColorSpace::DeviceRgb),
        "setcmykcolor" => |m| set_device_color(m, ColorSpace::DeviceCmyk),
        // hue saturation brightness sethsbcolor -
        "sethsbcolor" => |m| {
            let b = m.pop_real()?;
            let (h, s) = m.pop_xy()?;
            let c = hsb_to_rgb(h, s.clamp(0.0, 1.0), b.clamp(0.0, 1.0));
            let color = vec![c.r.into(), c.g.into(), c.b.into()];
            set_space_and_color(m, Rc::new(ColorSpace::DeviceRgb), color)
        },
        "currentgray" => |m| {
            m.push(m.gs().fill().as_gray());
            Ok(())
        },
        "currentrgbcolor" => |m| {
            let c = m.gs().fill().as_rgb();
            for v in [c.r, c.g, c.b] {
                m.push(v);
            }
            Ok(())
        },
        "currenthsbcolor" => |m| {
            let c = rgb_to_hsb(m.gs().fill().as_rgb());
            for v in c {
                m.push(v);
            }
            Ok(())
        },
        "currentcmykcolor" => |m| {
            let c = m.gs().fill().as_cmyk();
            for v in c {
                m.push(v);
            }
            Ok(())
        },
    );

    if level >= 2 {
        built_in_ops!(d;
            // name|array setcolorspace -
            "setcolorspace" => |m| {
                let v = m.pop()?;
                let space = ColorSpace::from_operand(m, &v)?;
                let color = space.initial_color();
                set_space_and_color(m, space, color)
            },
            "currentcolorspace" => |m| {
                let family = m.gs().color_space().family();
                m.push(Operand::array(vec![family.into()]));
                Ok(())
            },
            // comp1 .. comp(n) setcolor -
            // comp1 .. comp(n) pattern setcolor -
            "setcolor" => |m| {
                let n = m.gs().color_space().components();
                let color = m.pop_n(n)?;
                set_color(m, color)
            },
            "currentcolor" => |m| {
                let color = m.gs().color().to_vec();
                for c in color {
                    m.push(c);
                }
                Ok(())
            },
            // dict matrix makepattern -> pattern
            "makepattern" => |m| {
                let matrix: Transform2D<f64, PatternSpace, UserSpace> = (&m.pop()?).try_into()?;
                let proto = m.pop()?.dict_value()?;
                let mut pattern = proto.borrow().clone();
                pattern.find_by_name("PatternType")?.int()?;
                let implementation: PatternToPageSpace = matrix.then(m.gs().ctm());
                pattern.add("Implementation".into(), matrix_operand(&implementation));
                m.push(Operand::new_dict(pattern));
                Ok(())
            },
            // pattern setpattern -
            // comp1 .. comp(n) pattern setpattern -
            "setpattern" => |m| {
                let pattern = m.pop()?;
                let paint_type = pattern
                    .dict_value()?
                    .borrow()
                    .get_by_name("PaintType")
                    .and_then(Operand::opt_int)
                    .unwrap_or(1);
                let current = m.gs().color_space().clone();
                let is_pattern = matches!(&*current, ColorSpace::Pattern { .. });
                let space = if is_pattern {
                    current
                } else {
                    Rc::new(ColorSpace::Pattern {
                        underlying: Some(current),
                    })
                };
                let mut color = match &*space {
                    ColorSpace::Pattern { underlying: Some(u) } if paint_type == 2 => {
                        m.pop_n(u.components())?
                    }
                    _ => vec![],
                };
                color.push(pattern);
                if !is_pattern {
                    return set_space_and_color(m, space, color);
                }
                set_color(m, color)
            },
        );
    }
}
