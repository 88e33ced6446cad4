use super::*;
use crate::{parser::Tokenizer, MachineOption};
use assert_approx_eq::assert_approx_eq;
use test_case::test_case;
use test_log::test;

/// Run `s` and pop the color space operand it leaves.
fn space_of(s: &str) -> (Machine, Rc<ColorSpace>) {
    let mut m = Machine::new(MachineOption::default());
    m.run(&mut Tokenizer::new(s.as_bytes())).unwrap();
    let v = m.pop().unwrap();
    let space = ColorSpace::from_operand(&mut m, &v).unwrap();
    (m, space)
}

fn assert_rgb(exp: Rgb, act: Rgb) {
    assert_approx_eq!(exp.r, act.r);
    assert_approx_eq!(exp.g, act.g);
    assert_approx_eq!(exp.b, act.b);
}

#[test]
fn cmyk_to_rgb() {
    assert_eq!(Rgb::WHITE, Rgb::from_cmyk(0.0, 0.0, 0.0, 0.0));
    assert_eq!(Rgb::BLACK, Rgb::from_cmyk(0.0, 0.0, 0.0, 1.0));
    // channels saturate at 1
    assert_eq!(Rgb::new(0.0, 0.5, 0.5), Rgb::from_cmyk(0.8, 0.0, 0.0, 0.5));
}

#[test]
fn rgb_conversions() {
    assert_approx_eq!(0.3, Rgb::new(1.0, 0.0, 0.0).to_gray());
    assert_approx_eq!(0.59, Rgb::new(0.0, 1.0, 0.0).to_gray());
    assert_eq!([0.0, 1.0, 1.0, 0.0], Rgb::new(1.0, 0.0, 0.0).to_cmyk());
    assert_eq!([0.0, 0.0, 0.0, 0.75], BrushDescriptor::gray(0.25).as_cmyk());
    assert_eq!([255, 128, 0], Rgb::new(1.0, 0.5, -1.0).to_bytes());
}

#[test]
fn device_spaces() {
    let (mut m, space) = space_of("/DeviceCMYK");
    assert_eq!(4, space.components());
    assert_eq!(crate::sname("DeviceCMYK"), space.family());
    let brush = space
        .brush_descriptor(&mut m, &[0.into(), 0.into(), 0.into(), 1.into()])
        .unwrap();
    assert_eq!(Rgb::BLACK, brush.as_rgb());
    assert_eq!(ColorPrecision::Precise, brush.precision());

    let (mut m, space) = space_of("/DeviceGray");
    let brush = space.brush_descriptor(&mut m, &[2.into()]).unwrap();
    assert_approx_eq!(1.0, brush.as_gray());
}

#[test_case(-1.0, Rgb::new(1.0, 0.0, 0.0); "below range")]
#[test_case(1.0, Rgb::new(0.0, 1.0, 0.0); "in range")]
#[test_case(1.4, Rgb::new(0.0, 1.0, 0.0); "rounded")]
#[test_case(99.0, Rgb::WHITE; "above range")]
fn indexed_table(index: f64, exp: Rgb) {
    let (mut m, space) = space_of("[/Indexed /DeviceRGB 3 <ff0000 00ff00 0000ff ffffff>]");
    assert_eq!(1, space.components());
    assert_rgb(exp, space.get_color(&mut m, &[index]).unwrap());
}

#[test]
fn indexed_procedure() {
    let (mut m, space) = space_of("[/Indexed /DeviceGray 3 {3 div}]");
    assert_rgb(Rgb::WHITE, space.get_color(&mut m, &[99.0]).unwrap());
    assert_rgb(Rgb::BLACK, space.get_color(&mut m, &[-1.0]).unwrap());
    assert_eq!(0, m.operand_stack().len());
}

#[test]
fn indexed_procedure_gets_integer_index() {
    let (mut m, space) = space_of("[/Indexed /DeviceGray 1 {[0 1] exch get}]");
    assert_rgb(Rgb::WHITE, space.get_color(&mut m, &[1.0]).unwrap());
    let (mut m, space) =
        space_of("[/Indexed /DeviceGray 2 {type /integertype eq {1} {0} ifelse}]");
    assert_rgb(Rgb::WHITE, space.get_color(&mut m, &[1.4]).unwrap());
}

#[test]
fn indexed_table_too_short() {
    let (mut m, space) = space_of("[/Indexed /DeviceRGB 3 <ff0000>]");
    assert_eq!(
        Err(MachineError::RangeCheck),
        space.get_color(&mut m, &[2.0])
    );
}

#[test]
fn separation_tint_transform() {
    let (mut m, space) = space_of("1 [/Separation /Spot /DeviceRGB {dup dup}]");
    assert_eq!(1, m.operand_stack().len());
    assert_eq!(crate::sname("Separation"), space.family());
    assert_rgb(Rgb::gray(0.5), space.get_color(&mut m, &[0.5]).unwrap());
    assert_eq!(1, m.operand_stack().len());

    let brush = space.brush_descriptor(&mut m, &[0.5.into()]).unwrap();
    assert_rgb(Rgb::gray(0.5), brush.as_rgb());
    assert_eq!(1, m.operand_stack().len());
}

#[test]
fn device_n_components() {
    let (mut m, space) = space_of("[/DeviceN [/A /B] /DeviceGray {add 2 div}]");
    assert_eq!(2, space.components());
    assert_eq!(vec![Operand::from(1); 2], space.initial_color());
    assert_rgb(Rgb::gray(0.5), space.get_color(&mut m, &[0.25, 0.75]).unwrap());
}

#[test]
fn tint_transform_extra_results_dropped() {
    let mut m = Machine::new(MachineOption::default());
    m.push(7);
    let proc = Operand::procedure(vec![
        Operand::executable_name("dup"),
        Operand::executable_name("dup"),
    ]);
    let r = exec_tint_transform(&mut m, &proc, &[0.2.into()], 2).unwrap();
    assert_eq!(vec![0.2, 0.2], r);
    assert_eq!(1, m.operand_stack().len());
    assert_eq!(Ok(7), m.pop().and_then(|v| v.int()));
}

#[test]
fn tint_transform_underflow() {
    let mut m = Machine::new(MachineOption::default());
    let proc = Operand::procedure(vec![Operand::executable_name("pop")]);
    assert_eq!(
        Err(MachineError::StackUnderflow),
        exec_tint_transform(&mut m, &proc, &[0.2.into()], 1)
    );
}

#[test_case("/Lab", 3, ColorPrecision::Placeholder)]
#[test_case("/CalGray", 1, ColorPrecision::Placeholder)]
#[test_case("/Foo", 1, ColorPrecision::Placeholder)]
#[test_case("[/Indexed /DeviceGray 1 <00ff>]", 1, ColorPrecision::Precise)]
#[test_case("[/Separation /S /Lab {dup dup}]", 1, ColorPrecision::Placeholder)]
#[test_case("[/Pattern /DeviceRGB]", 4, ColorPrecision::Precise)]
fn precision(s: &str, components: usize, exp: ColorPrecision) {
    let (_, space) = space_of(s);
    assert_eq!(components, space.components());
    assert_eq!(exp, space.precision());
}

#[test]
fn unknown_space_placeholder() {
    let (mut m, space) = space_of("/Foo");
    assert_eq!(crate::sname("Foo"), space.family());
    let brush = space.brush_descriptor(&mut m, &[0.into()]).unwrap();
    assert_eq!(Rgb::PLACEHOLDER, brush.as_rgb());
    assert_eq!(ColorPrecision::Placeholder, brush.precision());
}

#[test]
fn cie_based_gray_average() {
    let (mut m, space) = space_of("/Lab");
    let brush = space
        .brush_descriptor(&mut m, &[0.2.into(), 0.4.into(), 0.6.into()])
        .unwrap();
    assert_approx_eq!(0.4, brush.as_gray());
    assert_eq!(ColorPrecision::Placeholder, brush.precision());
}

#[test]
fn named_color_space_resource() {
    let (_, space) = space_of("/Spot [/DeviceRGB] /ColorSpace defineresource pop /Spot");
    assert_eq!(3, space.components());
}

#[test]
fn device_n_needs_level_3() {
    let option = crate::MachineOptionBuilder::new().level(2).build();
    let mut m = Machine::new(option);
    m.run(&mut Tokenizer::new(b"[/DeviceN [/A] /DeviceGray {}]"))
        .unwrap();
    let v = m.pop().unwrap();
    let space = ColorSpace::from_operand(&mut m, &v).unwrap();
    assert_eq!(crate::sname("DeviceN"), space.family());
    assert_eq!(ColorPrecision::Placeholder, space.precision());
}

#[test]
fn precision_worst() {
    assert_eq!(
        ColorPrecision::Estimated,
        ColorPrecision::Precise.worst(ColorPrecision::Estimated)
    );
    assert_eq!(
        ColorPrecision::Placeholder,
        ColorPrecision::Placeholder.worst(ColorPrecision::Estimated)
    );
}
