use super::*;
use crate::{graphics::trans::DevicePoint, parser::Tokenizer, MachineOption};
use assert_approx_eq::assert_approx_eq;
use euclid::Transform2D;
use test_log::test;

const RED_TO_BLUE: &str = "<< /FunctionType 2 /Domain [0 1] /C0 [1 0 0] /C1 [0 0 1] /N 1 >>";

fn resolve(
    shading: &str,
    to_device: &UserToDeviceSpace,
) -> MachineResult<(Brush, ColorPrecision)> {
    let mut m = Machine::new(MachineOption::default());
    m.run(&mut Tokenizer::new(shading.as_bytes())).unwrap();
    let d = m.pop().unwrap().dict_value().unwrap();
    let bounds = DeviceRect::new((0.0, 0.0).into(), (100.0, 100.0).into());
    DefaultShadingManager.resolve(&mut m, &d, to_device, &bounds)
}

#[test]
fn axial_linear_function() {
    let s = format!(
        "<< /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 100 0] \
         /Function {RED_TO_BLUE} /Extend [true false] >>"
    );
    let (brush, precision) = resolve(&s, &Transform2D::translation(0.0, 10.0)).unwrap();
    assert_eq!(ColorPrecision::Precise, precision);
    let Brush::LinearGradient {
        start,
        end,
        stops,
        extend,
    } = brush
    else {
        panic!("expected linear gradient");
    };
    assert_eq!(DevicePoint::new(0.0, 10.0), start);
    assert_eq!(DevicePoint::new(100.0, 10.0), end);
    assert_eq!([true, false], extend);
    assert_eq!(
        vec![
            GradientStop {
                offset: 0.0,
                color: Rgb::new(1.0, 0.0, 0.0)
            },
            GradientStop {
                offset: 1.0,
                color: Rgb::new(0.0, 0.0, 1.0)
            },
        ],
        stops
    );
}

#[test]
fn axial_sampled_when_not_linear() {
    let s = "<< /ShadingType 2 /ColorSpace /DeviceGray /Coords [0 0 1 0] \
             /Function << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 2 >> >>";
    let (brush, precision) = resolve(s, &Transform2D::identity()).unwrap();
    assert_eq!(ColorPrecision::Estimated, precision);
    let Brush::LinearGradient { stops, extend, .. } = brush else {
        panic!("expected linear gradient");
    };
    assert_eq!([false, false], extend);
    assert_eq!(SAMPLED_STOPS + 1, stops.len());
    let mid = stops[SAMPLED_STOPS / 2];
    assert_approx_eq!(0.5, mid.offset);
    assert_approx_eq!(0.25, mid.color.r);
}

#[test]
fn radial_radius_scaled() {
    let s = format!(
        "<< /ShadingType 3 /ColorSpace /DeviceRGB /Coords [0 0 0 10 0 5] \
         /Function {RED_TO_BLUE} >>"
    );
    let (brush, _) = resolve(&s, &Transform2D::scale(2.0, 2.0)).unwrap();
    let Brush::RadialGradient {
        start_center,
        start_radius,
        end_center,
        end_radius,
        ..
    } = brush
    else {
        panic!("expected radial gradient");
    };
    assert_eq!(DevicePoint::new(0.0, 0.0), start_center);
    assert_eq!(DevicePoint::new(20.0, 0.0), end_center);
    assert_approx_eq!(0.0, start_radius);
    assert_approx_eq!(10.0, end_radius);
}

#[test]
fn function_per_component() {
    let f = "<< /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >>";
    let s = format!(
        "<< /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 1 1] \
         /Function [{f} {f} {f}] >>"
    );
    let (brush, precision) = resolve(&s, &Transform2D::identity()).unwrap();
    assert_eq!(ColorPrecision::Precise, precision);
    let Brush::LinearGradient { stops, .. } = brush else {
        panic!("expected linear gradient");
    };
    assert_eq!(Rgb::WHITE, stops[1].color);
}

#[test]
fn unsupported_shading_type() {
    let (brush, precision) =
        resolve("<< /ShadingType 4 >>", &Transform2D::identity()).unwrap();
    assert_eq!(Brush::Solid(Rgb::PLACEHOLDER), brush);
    assert_eq!(ColorPrecision::Placeholder, precision);
}

#[test]
fn placeholder_color_space_lowers_precision() {
    let s = "<< /ShadingType 2 /ColorSpace /Lab /Coords [0 0 1 0] \
             /Function << /FunctionType 2 /Domain [0 1] /C0 [0 0 0] /C1 [1 1 1] /N 1 >> >>";
    let (_, precision) = resolve(s, &Transform2D::identity()).unwrap();
    assert_eq!(ColorPrecision::Placeholder, precision);
}

#[test]
fn bad_coords() {
    let s = format!(
        "<< /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 1] /Function {RED_TO_BLUE} >>"
    );
    assert_eq!(
        Err(MachineError::RangeCheck),
        resolve(&s, &Transform2D::identity())
    );
    assert!(resolve("<< /ShadingType 2 >>", &Transform2D::identity()).is_err());
}
