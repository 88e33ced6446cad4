use super::*;
use crate::graphics::{color_space::Rgb, trans::PageRect};
use assert_approx_eq::assert_approx_eq;
use euclid::Transform2D;
use test_log::test;

fn page() -> PageRect {
    PageRect::new((0.0, 0.0).into(), (100.0, 200.0).into())
}

fn stack() -> GraphicsStateStack {
    GraphicsStateStack::new(GraphicsState::new(&page()))
}

#[test]
fn user_to_device_flips_y() {
    let s = GraphicsState::new(&page());
    let p = s.to_device(UserPoint::new(10.0, 0.0));
    assert_approx_eq!(10.0, p.x);
    assert_approx_eq!(200.0, p.y);
    let back = s.to_user(p).unwrap();
    assert_approx_eq!(0.0, back.y);
}

#[test]
fn concat_applies_before_ctm() {
    let mut s = GraphicsState::new(&page());
    s.concat_ctm(&Transform2D::scale(2.0, 2.0));
    s.concat_ctm(&Transform2D::translation(5.0, 0.0));
    let p = s.ctm().transform_point(UserPoint::new(1.0, 1.0));
    assert_approx_eq!(12.0, p.x);
    assert_approx_eq!(2.0, p.y);
    assert_approx_eq!(2.0, s.device_scale());
}

#[test]
fn singular_ctm() {
    let mut s = GraphicsState::new(&page());
    s.concat_ctm(&Transform2D::scale(0.0, 1.0));
    assert_eq!(
        Err(MachineError::UndefinedResult),
        s.to_user(DevicePoint::new(1.0, 1.0))
    );
}

#[test]
fn push_pop_restores_independent_copy() {
    let mut st = stack();
    st.current_mut().set_line_width(3.0);
    st.current_mut().path_mut().move_to(DevicePoint::new(1.0, 1.0));
    st.push();
    st.current_mut().set_line_width(5.0);
    st.current_mut().path_mut().line_to(DevicePoint::new(2.0, 2.0));
    st.current_mut()
        .set_color(vec![], BrushDescriptor::rgb(Rgb::new(1.0, 0.0, 0.0)));
    assert_eq!(1, st.depth());

    st.pop().unwrap();
    assert_eq!(3.0, st.current().line_width());
    assert_eq!(1, st.current().path().segments().len());
    assert_eq!(0.0, st.current().fill().as_gray());
    assert_eq!(0, st.depth());
}

#[test]
fn pop_empty_is_fatal() {
    let mut st = stack();
    let err = st.pop().unwrap_err();
    assert_eq!(MachineError::GraphicsStackUnderflow, err);
    assert!(err.is_fatal());
}

#[test]
fn grestore_stops_at_save() {
    let mut st = stack();
    st.current_mut().set_line_width(2.0);
    st.push_save(1);
    st.current_mut().set_line_width(3.0);
    st.pop().unwrap();
    assert_eq!(2.0, st.current().line_width());
    assert_eq!(1, st.depth());
}

#[test]
fn restore_unwinds_to_save_level() {
    let mut st = stack();
    st.push_save(1);
    st.current_mut().set_line_width(2.0);
    st.push();
    st.push_save(2);
    st.push();
    st.current_mut().set_line_width(9.0);

    st.restore(1).unwrap();
    assert_eq!(1.0, st.current().line_width());
    assert_eq!(0, st.depth());
    assert_eq!(Err(MachineError::InvalidRestore), st.restore(1));
}

#[test]
fn grestoreall() {
    let mut st = stack();
    st.push_save(1);
    st.current_mut().set_line_width(2.0);
    st.push();
    st.push();
    st.current_mut().set_line_width(4.0);
    st.pop_all();
    // state saved by `save` becomes current, it stays on the stack
    assert_eq!(1.0, st.current().line_width());
    assert_eq!(1, st.depth());
}
