//! Built-in operators, registered into `systemdict` by category.

use crate::{dictionary::EpsDictionary, operand::Command};

mod color;
mod composite;
mod control;
mod gstate;
mod math;
mod paint;
mod path;
mod resource;
mod stack;
mod text;
mod types;

/// Register closures as commands:
/// `built_in_ops!(dict; "name" => |m| { .. }, ..)`.
macro_rules! built_in_ops {
    ($d:expr; $($k:literal => $v:expr),* $(,)?) => {
        $($d.add_command($crate::operand::Command::new($k, $v));)*
    };
}
pub(super) use built_in_ops;

/// Create the `systemdict`, operators of later language levels are left
/// out for lower `level`.
pub(super) fn system_dict(level: u8) -> EpsDictionary {
    let mut d = EpsDictionary::with_capacity(400);
    stack::register(&mut d);
    math::register(&mut d);
    composite::register(&mut d, level);
    types::register(&mut d);
    control::register(&mut d, level);
    gstate::register(&mut d, level);
    path::register(&mut d, level);
    paint::register(&mut d, level);
    color::register(&mut d, level);
    text::register(&mut d, level);
    resource::register(&mut d, level);
    d
}

/// Create the `errordict`.
pub(super) fn error_dict() -> EpsDictionary {
    let mut d = EpsDictionary::new();
    // - handleerror -
    d.add_command(Command::new("handleerror", |m| {
        let e = m.dicts.dollar_error.clone();
        let mut e = e.borrow_mut();
        if e.get_by_name("newerror").and_then(|v| v.opt_bool()) == Some(true) {
            let text = |key: &str| {
                e.get_by_name(key)
                    .and_then(|v| v.to_text().ok())
                    .unwrap_or_default()
            };
            log::error!(
                "PostScript error: {}, offending command: {}",
                text("errorname"),
                text("command")
            );
            e.add("newerror".into(), false.into());
        }
        Ok(())
    }));
    d
}
