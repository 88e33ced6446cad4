use super::*;
use crate::{name, operand::PsString};
use test_log::test;

#[test]
fn define_find_undefine() {
    let mut m = ResourceManager::new();
    let cat = name("Pattern");
    m.define(cat.clone(), "P1".into(), 1.into());
    m.define(cat.clone(), "P1".into(), 2.into());

    assert_eq!(Some(&Operand::from(2)), m.try_find(&cat, &"P1".into()));
    // string key addresses the same resource
    assert_eq!(
        Ok(&Operand::from(2)),
        m.find(&cat, &Operand::string(PsString::literal("P1")))
    );
    assert_eq!(None, m.try_find(&name("Form"), &"P1".into()));

    assert_eq!(Some(Operand::from(2)), m.undefine(&cat, &"P1".into()));
    assert_eq!(
        Err(MachineError::UndefinedResource {
            category: cat.clone(),
            key: "P1".to_owned()
        }),
        m.find(&cat, &"P1".into())
    );
    assert_eq!(None, m.undefine(&name("Form"), &"P1".into()));
}

#[test]
fn filtered_resources_ignores_template() {
    let mut m = ResourceManager::new();
    let cat = name("Form");
    m.define(cat.clone(), "a".into(), 1.into());
    m.define(cat.clone(), "b".into(), 2.into());

    let all = m.get_filtered_resources(&cat, &Operand::string(PsString::literal("x*")));
    assert_eq!(
        vec![
            (Operand::name("a"), Operand::from(1)),
            (Operand::name("b"), Operand::from(2)),
        ],
        all
    );
    assert!(m
        .get_filtered_resources(&name("Font"), &Operand::null())
        .is_empty());
}
