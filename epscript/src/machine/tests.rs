use super::*;
use crate::{
    graphics::{trans::PageRect, Brush, GraphicNode, LineCapStyle, Rgb},
    parser::Tokenizer,
    sname, MachineOptionBuilder,
};
use assert_approx_eq::assert_approx_eq;
use test_case::test_case;
use test_log::test;

macro_rules! ops {
    ($($e:expr),* $(,)?) => {
        vec![$(Operand::from($e)),*]
    };
}

fn run_with(option: MachineOption, s: &str) -> MachineResult<Machine> {
    let mut m = Machine::new(option);
    m.run(&mut Tokenizer::new(s.as_bytes()))?;
    Ok(m)
}

fn run(s: &str) -> Machine {
    run_with(MachineOption::default(), s).unwrap()
}

fn run_err(s: &str) -> MachineError {
    match run_with(MachineOption::default(), s) {
        Ok(m) => panic!("expected error, stack: {:?}", stack(&m)),
        Err(e) => e,
    }
}

fn stack(m: &Machine) -> Vec<Operand> {
    m.operand_stack().iter().cloned().collect()
}

/// Run `s` and assert the whole operand stack, bottom first.
fn assert_op(s: &str, exp: Vec<Operand>) {
    let m = run(s);
    assert_eq!(exp, stack(&m), "script: {s}");
}

/// Run `s` and assert the reals left on the operand stack.
fn assert_reals(s: &str, exp: &[f64]) {
    let m = run(s);
    let act = stack(&m);
    assert_eq!(exp.len(), act.len(), "script: {s}, stack: {act:?}");
    for (e, a) in exp.iter().zip(act.iter()) {
        assert_approx_eq!(*e, a.real().unwrap());
    }
}

#[test_case("1 2 3 4 5 3 copy", ops![1, 2, 3, 4, 5, 3, 4, 5]; "copy")]
#[test_case("1 2 3 3 1 roll", ops![3, 1, 2]; "roll")]
#[test_case("1 2 3 3 -1 roll", ops![2, 3, 1]; "roll back")]
#[test_case("1 2 3 1 index", ops![1, 2, 3, 2]; "index")]
#[test_case("10 2 count", ops![10, 2, 2]; "count")]
#[test_case("1 mark 2 3 counttomark", ops![1, Operand::mark(), 2, 3, 2]; "counttomark")]
#[test_case("1 mark 2 3 cleartomark", ops![1]; "cleartomark")]
#[test_case("1 2 exch pop", ops![2]; "exch pop")]
#[test_case("1 2 clear", ops![]; "clear")]
fn stack_ops(s: &str, exp: Vec<Operand>) {
    assert_op(s, exp);
}

#[test_case("1 2 add", ops![3]; "add")]
#[test_case("1 2.5 add", ops![3.5]; "add real")]
#[test_case("2147483647 1 add", ops![2_147_483_648.0]; "add overflow")]
#[test_case("7 2 idiv", ops![3]; "idiv")]
#[test_case("-7 2 mod", ops![-1]; "mod")]
#[test_case("3 4 lt 1 1.0 eq", ops![true, true]; "compare")]
#[test_case("(abc) (abd) lt", ops![true]; "string compare")]
#[test_case("/abc (abc) eq", ops![true]; "name string eq")]
#[test_case("12 3 and 1 4 bitshift", ops![0, 16]; "bits")]
#[test_case("true false or not", ops![false]; "bool")]
fn arith_ops(s: &str, exp: Vec<Operand>) {
    assert_op(s, exp);
}

#[test]
fn math_reals() {
    assert_reals("2 sqrt dup mul 1 2 div", &[2.0, 0.5]);
    assert_reals("90 sin 0 cos 0 1 atan", &[1.0, 1.0, 0.0]);
    assert_reals("2.5 round -2.5 truncate 2.1 ceiling", &[3.0, -2.0, 3.0]);
}

#[test]
fn eq_unrelated_types() {
    assert_eq!(MachineError::TypeCheck, run_err("1 (a) eq"));
    assert_op("1 null eq", ops![false]);
}

#[test_case("1 0 div", MachineError::UndefinedResult)]
#[test_case("pop", MachineError::StackUnderflow)]
#[test_case("/a 1 add", MachineError::TypeCheck)]
#[test_case("nosuchname", MachineError::Undefined(sname("nosuchname")))]
#[test_case("}", MachineError::SyntaxError)]
#[test_case("counttomark", MachineError::UnMatchedMark)]
#[test_case("stop", MachineError::UnhandledStop)]
#[test_case("grestore", MachineError::GraphicsStackUnderflow)]
#[test_case("5 restore", MachineError::InvalidRestore)]
#[test_case("-2147483647 1 sub restore", MachineError::InvalidRestore; "restore min int")]
#[test_case("2147483647 array", MachineError::LimitCheck; "array too long")]
#[test_case("65536 string", MachineError::LimitCheck; "string too long")]
#[test_case("70000 dict", MachineError::LimitCheck; "dict too large")]
#[test_case("<< /a >>", MachineError::RangeCheck)]
fn errors(s: &str, exp: MachineError) {
    assert_eq!(exp, run_err(s));
}

#[test]
fn procedure_creation_defers_names() {
    let m = run("{1 2 add nosuchname {3 mul}}");
    let items = stack(&m);
    assert_eq!(1, items.len());
    assert!(items[0].is_executable());
    let body = items[0].procedure_value().unwrap();
    let body = body.borrow();
    assert_eq!(5, body.len());
    assert_eq!(Some(&sname("add")), body[2].opt_executable_name());
    assert_eq!(Some(&sname("nosuchname")), body[3].opt_executable_name());
    assert_eq!(2, body[4].procedure_value().unwrap().borrow().len());
}

#[test]
fn procedure_deferred_until_called() {
    assert_op("/sq {dup mul} def 3 sq", ops![9]);
    assert_op("{1} exec 2 {3} if", ops![1, 3]);
    assert_op("false {1} {2} ifelse", ops![2]);
}

#[test]
fn always_execute_command_at_any_level() {
    // `{` and `}` run while a procedure is being built
    let mut m = Machine::new(MachineOption::default());
    let mut source = crate::OperandList::new(vec![
        Operand::executable_name("{"),
        Operand::executable_name("{"),
        Operand::executable_name("pop"),
        Operand::executable_name("}"),
        Operand::executable_name("}"),
    ]);
    m.run(&mut source).unwrap();
    let outer = m.pop().unwrap().procedure_value().unwrap();
    let inner = outer.borrow()[0].procedure_value().unwrap();
    assert_eq!(1, inner.borrow().len());
    assert_eq!(0, m.procedure_creation_level);
}

#[test]
fn stopped_catches_stop() {
    assert_op("{1 stop 2} stopped", ops![1, true]);
    assert_op("{1 2} stopped", ops![1, 2, false]);
    // inner stopped consumes the stop, the outer context completes
    assert_op("{{stop} stopped pop 3} stopped", ops![3, false]);
}

#[test]
fn stop_breaks_loops() {
    assert_op("{1 {stop} loop} stopped", ops![1, true]);
    assert_op("{0 1 1 5 {pop stop} for 9} stopped", ops![0, true]);
}

#[test]
fn stopped_records_error() {
    let m = run("{1 nosuchname} stopped");
    assert_eq!(ops![1, true], stack(&m));
    let e = m.dicts.dollar_error.borrow();
    assert_eq!(Some(true), e.get_by_name("newerror").and_then(Operand::opt_bool));
    assert_eq!(
        Some(sname("undefined")),
        e.get_by_name("errorname").and_then(Operand::opt_name_value)
    );
    drop(e);

    let m = run("{nosuchname} stopped pop errordict /handleerror get exec");
    let e = m.dicts.dollar_error.borrow();
    assert_eq!(Some(false), e.get_by_name("newerror").and_then(Operand::opt_bool));
}

#[test]
fn stopped_rethrows_fatal_error() {
    assert_eq!(
        MachineError::GraphicsStackUnderflow,
        run_err("{grestore} stopped")
    );
}

#[test_case("0 1 1 10 {add} for", ops![55]; "for")]
#[test_case("10 -5 0 {} for", ops![10, 5, 0]; "for down")]
#[test_case("0 0.5 1 {} for", ops![0.0, 0.5, 1.0]; "for real")]
#[test_case("0 3 {1 add} repeat", ops![3]; "repeat")]
#[test_case("0 {1 add dup 5 eq {exit} if} loop", ops![5]; "loop exit")]
#[test_case("[1 2 3] {2 mul} forall", ops![2, 4, 6]; "forall array")]
#[test_case("(ab) {} forall", ops![97, 98]; "forall string")]
#[test_case("0 [1 2 3] {dup 2 eq {pop exit} if add} forall", ops![1]; "forall exit")]
#[test_case("1 2 {3 {exit} loop 4} repeat", ops![1, 3, 4, 3, 4]; "exit inner loop only")]
fn loops(s: &str, exp: Vec<Operand>) {
    assert_op(s, exp);
}

#[test]
fn exit_outside_loop_ignored() {
    assert_op("1 exit 2", ops![1, 2]);
}

#[test]
fn quit_and_closefile_end_run() {
    assert_op("1 quit 2", ops![1]);
    assert_op("1 currentfile closefile 2", ops![1]);
    assert_op("{1 quit} stopped 2", ops![1, false]);
}

#[test]
fn negative_repeat() {
    assert_eq!(MachineError::RangeCheck, run_err("-1 {} repeat"));
}

#[test]
fn dictionary_ops() {
    assert_op("/d 2 dict def d /a 1 put d /a get", ops![1]);
    assert_op("/d 2 dict def d /a 1 put d /a known d /b known", ops![true, false]);
    assert_op("<< /a 1 /b 2 >> length", ops![2]);
    assert_op("1 dict begin /x 5 def x end /x where", ops![5, false]);
    assert_op("/x 1 def 1 dict begin /x 2 store end x", ops![2]);
    assert_op("/x 1 def /x undef /x where", ops![false]);
    assert_op("countdictstack 2 dict begin countdictstack", ops![3, 4]);
    assert_op(
        "1 dict begin 1 dict begin cleardictstack countdictstack",
        ops![3]
    );
    assert_op("end countdictstack", ops![3]);
    assert_eq!(
        MachineError::Undefined(sname("nope")),
        run_err("/nope load")
    );
}

#[test]
fn def_goes_to_userdict() {
    let m = run("/x 42 def");
    assert_eq!(
        Some(&Operand::from(42)),
        m.dicts.user.borrow().get_by_name("x")
    );
    assert!(m.dicts.system.borrow().is_permanent());
}

#[test]
fn user_definitions_shadow_system() {
    assert_op("/add {sub} def 5 3 add", ops![2]);
}

#[test_case("[1 2 3] 1 get", ops![2]; "get")]
#[test_case("[1 2 3] dup 0 9 put 0 get", ops![9]; "put")]
#[test_case("[1 2 3 4] 1 2 getinterval aload pop", ops![2, 3]; "getinterval")]
#[test_case("(abc) 1 get", ops![98]; "string get")]
#[test_case("1 2 2 array astore length", ops![2]; "astore")]
#[test_case("3 string length", ops![3]; "string")]
#[test_case("/d 3 string def (ab) d copy pop d 1 get", ops![98]; "string copy fills dest")]
#[test_case("/d 3 string def (ab) d copy 0 88 put d 0 get", ops![97]; "string copy result is new")]
#[test_case("/s (abc) def s 1 1 getinterval 0 88 put s 1 get", ops![98]; "getinterval result is new")]
fn composite_ops(s: &str, exp: Vec<Operand>) {
    assert_op(s, exp);
}

#[test]
fn composite_range_check() {
    assert_eq!(MachineError::RangeCheck, run_err("[1 2] 2 get"));
    assert_eq!(MachineError::RangeCheck, run_err("[1 2] 1 5 getinterval"));
}

#[test_case("1 type", ops![sname("integertype")])]
#[test_case("/a cvx xcheck /a xcheck", ops![true, false])]
#[test_case("(abc) cvn", ops![sname("abc")])]
#[test_case("123 10 string cvs (123) eq", ops![true])]
#[test_case("1.5 cvi 3 cvr", ops![1, 3.0])]
fn type_ops(s: &str, exp: Vec<Operand>) {
    assert_op(s, exp);
}

#[test]
fn bind_replaces_operators() {
    assert_op("/f {add {mul}} bind def /f load 0 get type", ops![sname("operatortype")]);
    assert_op("/f {add {mul}} bind def /f load 1 get 0 get type", ops![sname("operatortype")]);
    // unknown names are kept
    assert_op("/f {foo} bind def /f load 0 get type", ops![sname("nametype")]);
    // later redefinition does not affect bound procedure
    assert_op("/f {add} bind def /add {sub} def 5 3 f", ops![8]);
}

#[test]
fn save_restore() {
    assert_op(
        "save 2 setlinewidth 1 dict begin restore currentlinewidth countdictstack",
        ops![1.0, 3],
    );
    assert_op("/s save def /x 1 def s restore x", ops![1]);
    assert_op("save save exch pop restore", ops![]);
    assert_eq!(MachineError::InvalidRestore, run_err("save dup restore restore"));
}

#[test]
fn gsave_grestore() {
    assert_op(
        "gsave 3 setlinewidth gsave 5 setlinewidth grestore currentlinewidth grestore currentlinewidth",
        ops![3.0, 1.0],
    );
    assert_op(
        "save pop 2 setlinewidth grestore currentlinewidth 3 setlinewidth grestore currentlinewidth",
        ops![1.0, 1.0],
    );
    assert_op(
        "gsave gsave 4 setlinewidth grestoreall currentlinewidth",
        ops![1.0],
    );
}

#[test]
fn matrix_ops() {
    assert_reals("10 20 translate 2 2 scale 1 1 transform", &[12.0, 22.0]);
    assert_reals("2 2 scale 4 4 itransform", &[2.0, 2.0]);
    assert_reals("90 rotate 1 0 transform", &[0.0, 1.0]);
    assert_reals("2 3 scale 1 1 dtransform", &[2.0, 3.0]);
    assert_reals(
        "matrix currentmatrix aload pop",
        &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    );
    assert_reals(
        "[2 0 0 2 5 5] matrix invertmatrix aload pop",
        &[0.5, 0.0, 0.0, 0.5, -2.5, -2.5],
    );
}

#[test]
fn path_ops() {
    assert_reals("0 0 moveto 10 5 rlineto currentpoint", &[10.0, 5.0]);
    assert_reals(
        "2 2 scale 1 1 moveto 3 4 lineto pathbbox",
        &[1.0, 1.0, 3.0, 4.0],
    );
    assert_reals("0 0 moveto 10 0 lineto closepath currentpoint", &[0.0, 0.0]);
    assert_eq!(MachineError::NoCurrentPoint, run_err("10 10 lineto"));
    assert_eq!(MachineError::NoCurrentPoint, run_err("newpath pathbbox"));
}

#[test]
fn arc_ends_on_circle() {
    assert_reals("0 0 10 0 90 arc currentpoint", &[0.0, 10.0]);
    assert_reals("0 0 10 90 0 arcn currentpoint", &[10.0, 0.0]);
    // end angle far from start still ends on the circle
    let m = run("0 0 10 0 1e20 arcn currentpoint");
    let [x, y] = [0, 1].map(|i| stack(&m)[i].real().unwrap());
    assert_approx_eq!(10.0, x.hypot(y), 1e-6);
    assert_eq!(MachineError::RangeCheck, run_err("0 0 10 0 1e400 arc"));
}

#[test]
fn color_ops() {
    assert_reals("0.25 setgray currentgray", &[0.25]);
    assert_reals("1 0 0 setrgbcolor currentrgbcolor", &[1.0, 0.0, 0.0]);
    assert_reals("0 0 0 1 setcmykcolor currentrgbcolor", &[0.0, 0.0, 0.0]);
    assert_reals("0 1 1 sethsbcolor currentrgbcolor", &[1.0, 0.0, 0.0]);
    assert_reals("0.5 setgray currentcmykcolor", &[0.0, 0.0, 0.0, 0.5]);
    assert_reals(
        "[/Separation /S /DeviceRGB {dup dup}] setcolorspace 0.5 setcolor currentrgbcolor",
        &[0.5, 0.5, 0.5],
    );
    assert_reals(
        "[/Indexed /DeviceGray 1 {[0 1] exch get}] setcolorspace 1 setcolor currentgray",
        &[1.0],
    );
    assert_op("/DeviceCMYK setcolorspace currentcolor", ops![0, 0, 0, 1]);
    assert_op("/DeviceRGB setcolorspace currentcolorspace 0 get", ops![sname("DeviceRGB")]);
}

#[test]
fn level_gates_operators() {
    let level1 = MachineOptionBuilder::new().level(1).build();
    assert_eq!(
        Err(MachineError::Undefined(sname("languagelevel"))),
        run_with(level1.clone(), "languagelevel").map(|m| stack(&m))
    );
    assert_eq!(
        Err(MachineError::Undefined(sname("setcolorspace"))),
        run_with(level1, "/DeviceRGB setcolorspace").map(|m| stack(&m))
    );
    let level2 = MachineOptionBuilder::new().level(2).build();
    let m = run_with(level2.clone(), "languagelevel").unwrap();
    assert_eq!(ops![2], stack(&m));
    assert_eq!(
        Err(MachineError::Undefined(sname("shfill"))),
        run_with(level2, "<< >> shfill").map(|m| stack(&m))
    );
}

#[test]
fn operation_budget() {
    let option = MachineOptionBuilder::new().max_operations(Some(100)).build();
    assert_eq!(
        Err(MachineError::ExecutionLimitExceeded(100)),
        run_with(option.clone(), "{1 pop} loop").map(|m| stack(&m))
    );
    assert_eq!(
        Err(MachineError::ExecutionLimitExceeded(100)),
        run_with(option, "{} loop").map(|m| stack(&m))
    );
}

#[test]
fn recursion_guard() {
    let option = MachineOptionBuilder::new().max_depth(32).build();
    assert_eq!(
        Err(MachineError::RecursionTooDeep(32)),
        run_with(option.clone(), "/f {f} def f").map(|m| stack(&m))
    );
    // not caught by stopped
    assert_eq!(
        Err(MachineError::RecursionTooDeep(32)),
        run_with(option, "/f {f} def {f} stopped").map(|m| stack(&m))
    );
}

#[test]
fn text_advances_current_point() {
    assert_reals(
        "/Helvetica findfont 10 scalefont setfont 0 0 moveto (ab) show currentpoint",
        &[10.0, 0.0],
    );
    assert_reals(
        "/Helvetica 10 selectfont (abc) stringwidth",
        &[15.0, 0.0],
    );
    assert_reals(
        "/Helvetica 10 selectfont 0 0 moveto 1 0 97 (aba) widthshow currentpoint",
        &[17.0, 0.0],
    );
    assert_eq!(
        MachineError::NoCurrentPoint,
        run_err("/Helvetica 10 selectfont (a) show")
    );
}

#[test]
fn definefont_registers_font() {
    assert_op(
        "/F << /FontType 3 >> definefont pop /F findfont /FontType get",
        ops![3],
    );
    assert_op("FontDirectory /F known", ops![false]);
}

#[test]
fn resource_ops() {
    assert_op(
        "/k 5 /Cat defineresource pop /k /Cat findresource",
        ops![5],
    );
    assert_op(
        "/k 5 /Cat defineresource pop /k /Cat resourcestatus",
        ops![1, -1, true],
    );
    assert_op(
        "/k 5 /Cat defineresource pop /k /Cat undefineresource /k /Cat resourcestatus",
        ops![false],
    );
    assert_op(
        "/a 1 /Cat defineresource /b 2 /Cat defineresource pop pop 0 (*) {pop 1 add} 100 string /Cat resourceforall",
        ops![2],
    );
    assert!(matches!(
        run_err("/k /Cat findresource"),
        MachineError::UndefinedResource { .. }
    ));
}

fn painted(s: &str) -> GraphicGroup {
    let option = MachineOptionBuilder::new()
        .page_box(PageRect::new((0.0, 0.0).into(), (100.0, 100.0).into()))
        .build();
    run_with(option, s).unwrap().finish()
}

#[test]
fn fill_adds_path() {
    let g = painted("newpath 0 0 moveto 10 0 lineto 10 10 lineto closepath fill");
    let paths: Vec<_> = g.paths().collect();
    assert_eq!(1, paths.len());
    assert_eq!(Some(Brush::Solid(Rgb::BLACK)), paths[0].fill);
    assert_eq!(None, paths[0].stroke);
    let bounds = paths[0].geometry.bounds().unwrap();
    // device y axis points down
    assert_approx_eq!(90.0, bounds.min.y);
    assert_approx_eq!(100.0, bounds.max.y);
}

#[test]
fn paint_consumes_path() {
    let g = painted("0 0 moveto 10 10 lineto stroke fill stroke");
    assert_eq!(1, g.paths().count());
}

#[test]
fn stroke_style() {
    let g = painted("2 2 scale 3 setlinewidth [1 2] 0 setdash 1 setlinecap 0 0 moveto 5 5 lineto stroke");
    let path = g.paths().next().unwrap();
    let stroke = path.stroke.as_ref().unwrap();
    assert_approx_eq!(6.0, stroke.width);
    assert_eq!(vec![2.0, 4.0], stroke.dash);
    assert_eq!(LineCapStyle::Round, stroke.cap);
    assert_eq!(None, path.fill);
}

#[test]
fn rectfill_keeps_current_path() {
    let g = painted("1 0 0 setrgbcolor 0 0 moveto 5 5 lineto 0 0 10 10 rectfill stroke");
    let paths: Vec<_> = g.paths().collect();
    assert_eq!(2, paths.len());
    assert_eq!(Some(Brush::Solid(Rgb::new(1.0, 0.0, 0.0))), paths[0].fill);
    assert!(paths[1].stroke.is_some());
}

#[test]
fn clip_groups_paths() {
    let g = painted("0 0 50 50 rectclip 0 0 10 10 rectfill initclip 0 0 10 10 rectfill");
    assert_eq!(2, g.children.len());
    let GraphicNode::Group(clipped) = &g.children[0] else {
        panic!("expected clipped group");
    };
    assert!(clipped.clip.is_some());
    assert!(matches!(g.children[1], GraphicNode::Path(_)));
}

#[test]
fn opacity_group() {
    let g = painted("0.5 .setopacityalpha 0 0 10 10 rectfill");
    let GraphicNode::Group(group) = &g.children[0] else {
        panic!("expected opacity group");
    };
    assert_approx_eq!(0.5, group.opacity);
}

#[test]
fn execform_runs_paint_proc() {
    let g = painted(
        "<< /FormType 1 /BBox [0 0 10 10] /Matrix [1 0 0 1 5 5] \
         /PaintProc {pop 0 0 10 10 rectfill} >> execform",
    );
    assert_eq!(1, g.paths().count());
}

#[test]
fn shfill_paints_clip_bounds() {
    let g = painted(
        "<< /ShadingType 2 /ColorSpace /DeviceGray /Coords [0 0 1 0] \
         /Function << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >> >> shfill",
    );
    let path = g.paths().next().unwrap();
    assert!(matches!(path.fill, Some(Brush::LinearGradient { .. })));
    assert_eq!(ColorPrecision::Precise, path.precision);
}

#[test]
fn unknown_color_space_is_placeholder() {
    let g = painted("/Foo setcolorspace 0 0 10 10 rectfill");
    assert_eq!(ColorPrecision::Placeholder, g.precision());
}

#[test]
fn interpret_whole_source() {
    let g = interpret(
        MachineOption::default(),
        &mut Tokenizer::new(b"0 0 10 10 rectfill"),
    )
    .unwrap();
    assert_eq!(1, g.paths().count());
    assert!(interpret(MachineOption::default(), &mut Tokenizer::new(b"0 0 10 10 rectfill pop"))
        .is_err());
}
