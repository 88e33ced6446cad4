use super::*;
use crate::operand::PsString;
use assert_approx_eq::assert_approx_eq;
use test_case::test_case;

fn nums(v: &[f64]) -> Operand {
    Operand::array(v.iter().copied().map(Operand::from).collect())
}

fn dict(entries: Vec<(&str, Operand)>) -> Operand {
    Operand::new_dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
}

fn exponential(c0: &[f64], c1: &[f64], n: f64) -> Operand {
    dict(vec![
        ("FunctionType", 2.into()),
        ("Domain", nums(&[0.0, 1.0])),
        ("C0", nums(c0)),
        ("C1", nums(c1)),
        ("N", n.into()),
    ])
}

#[test_case(0.0, 0.0)]
#[test_case(0.5, 0.25)]
#[test_case(1.0, 1.0)]
#[test_case(2.0, 1.0; "clipped by domain")]
fn exponential_function(x: f64, exp: f64) {
    let f = function_from_operand(&exponential(&[0.0], &[1.0], 2.0)).unwrap();
    assert_approx_eq!(exp, f.call(&[x]).unwrap()[0]);
    assert!(!f.is_linear());
}

#[test]
fn exponential_defaults() {
    let f = function_from_operand(&dict(vec![
        ("FunctionType", 2.into()),
        ("Domain", nums(&[0.0, 1.0])),
        ("N", 1.into()),
    ]))
    .unwrap();
    assert_eq!(vec![0.5], f.call(&[0.5]).unwrap());
    assert!(f.is_linear());
}

#[test_case(0.25, 0.5)]
#[test_case(0.5, 0.0)]
#[test_case(0.75, 0.5)]
fn stitching_function(x: f64, exp: f64) {
    let f = function_from_operand(&dict(vec![
        ("FunctionType", 3.into()),
        ("Domain", nums(&[0.0, 1.0])),
        (
            "Functions",
            Operand::array(vec![
                exponential(&[0.0], &[1.0], 1.0),
                exponential(&[0.0], &[1.0], 1.0),
            ]),
        ),
        ("Bounds", nums(&[0.5])),
        ("Encode", nums(&[0.0, 1.0, 0.0, 1.0])),
    ]))
    .unwrap();
    assert_approx_eq!(exp, f.call(&[x]).unwrap()[0]);
}

#[test_case(0.0, 0.0)]
#[test_case(0.5, 1.0)]
#[test_case(0.25, 0.5)]
#[test_case(1.0, 0.0)]
fn sampled_function(x: f64, exp: f64) {
    let f = function_from_operand(&dict(vec![
        ("FunctionType", 0.into()),
        ("Domain", nums(&[0.0, 1.0])),
        ("Range", nums(&[0.0, 1.0])),
        ("Size", nums(&[3.0])),
        ("BitsPerSample", 8.into()),
        (
            "DataSource",
            Operand::string(PsString::literal(vec![0u8, 255, 0])),
        ),
    ]))
    .unwrap();
    assert_approx_eq!(exp, f.call(&[x]).unwrap()[0]);
}

#[test]
fn unsupported_function_type() {
    assert!(matches!(
        function_from_operand(&dict(vec![("FunctionType", 4.into())])),
        Err(MachineError::Unsupported(_))
    ));
}
