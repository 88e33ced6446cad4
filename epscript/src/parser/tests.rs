use super::*;
use crate::operand::Value;
use either::{Left, Right};
use test_case::test_case;

fn tokens(s: &str) -> Vec<Operand> {
    let mut t = Tokenizer::new(s.as_bytes());
    let mut r = vec![];
    while let Some(op) = t.next_operand().unwrap() {
        r.push(op);
    }
    r
}

#[test_case(b"1" => Some(Left(1)))]
#[test_case(b"-98" => Some(Left(-98)))]
#[test_case(b"+17" => Some(Left(17)))]
#[test_case(b"-.002" => Some(Right(-0.002)))]
#[test_case(b"34.5" => Some(Right(34.5)))]
#[test_case(b"123.6e10" => Some(Right(123.6e10)))]
#[test_case(b"-1." => Some(Right(-1.)))]
#[test_case(b"1E6" => Some(Right(1E6)))]
#[test_case(b"100000000000" => Some(Right(100_000_000_000.0)); "int overflow")]
#[test_case(b"8#1777" => Some(Left(0o1777)))]
#[test_case(b"16#FFFE" => Some(Left(0xFFFE)))]
#[test_case(b"16#FFFFFFFF" => Some(Left(-1)); "radix wraps")]
#[test_case(b"36#z" => Some(Left(35)))]
#[test_case(b"10A" => None)]
#[test_case(b"inf" => None)]
#[test_case(b"-" => None)]
#[test_case(b"1.2.3" => None)]
fn number(buf: &[u8]) -> Option<Either<i32, f64>> {
    parse_number(buf)
}

#[test_case(b"()" => &b""[..]; "empty")]
#[test_case(b"(foo)" => &b"foo"[..])]
#[test_case(b"(&%*<()>)" => &b"&%*<()>"[..]; "nested empty and special symbols")]
#[test_case(b"((a()b))" => &b"(a()b)"[..]; "nested")]
#[test_case(br"(\n\0234\r)" => &b"\n\x134\r"[..]; "escape")]
#[test_case(br"(\10a)" => &b"\x08a"[..]; "oct esc 2 bytes long")]
#[test_case(br"(\700a)" => &b"\xc0a"[..]; "oct exceed 255 trunc extra bits")]
#[test_case(b"(a\\\r\nb)" => &b"ab"[..]; "escaped newline")]
#[test_case(br"(\q)" => &b"q"[..]; "unknown escape")]
fn literal_strings(buf: &[u8]) -> Vec<u8> {
    literal_string.parse(buf).unwrap()
}

#[test_case(b"<>" => &b""[..]; "empty hex")]
#[test_case(b"<a1b2>" => &b"\xa1\xb2"[..]; "hex two")]
#[test_case(b"< a1 >" => &b"\xa1"[..]; "ignore whitespace")]
#[test_case(b"<a1 b>" => &b"\xa1\xb0"[..]; "odd hex length")]
fn hex_strings(buf: &[u8]) -> Vec<u8> {
    hex_string.parse(buf).unwrap()
}

#[test]
fn base85_string_decoded_on_use() {
    let ops = tokens("<~9jqo^~>");
    let s = ops[0].string_value().unwrap();
    assert_eq!(StringEncoding::Base85, s.encoding());
    assert_eq!(b"Man ", s.bytes().unwrap().as_slice());
}

#[test]
fn names() {
    let ops = tokens("/Name/Second exec //Imm /(s)");
    assert_eq!(Operand::name("Name"), ops[0]);
    assert!(!ops[0].is_executable());
    assert_eq!(Operand::name("Second"), ops[1]);
    assert_eq!(Some(&crate::name("exec")), ops[2].opt_executable_name());
    assert_eq!(Some(&crate::name("Imm")), ops[3].opt_executable_name());
    assert_eq!(Operand::name(""), ops[4]);
    assert!(matches!(ops[5].value(), Value::String(_)));
}

#[test]
fn special_names_are_executable() {
    let ops = tokens("{[<<>>]}");
    let names: Vec<_> = ops
        .iter()
        .map(|op| op.opt_executable_name().unwrap().to_string())
        .collect();
    assert_eq!(vec!["{", "[", "<<", ">>", "]", "}"], names);
}

#[test]
fn comments_and_white_space() {
    let ops = tokens("%!PS-Adobe-3.0 EPSF-3.0\n 1 % one\r\n\t2%two\x0c3");
    assert_eq!(vec![Operand::from(1), 2.into(), 3.into()], ops);
}

#[test]
fn procedure_tokens() {
    let ops = tokens("{ 10 1.5 ($) add }");
    assert_eq!(6, ops.len());
    assert_eq!(Operand::from(10), ops[1]);
    assert_eq!(Operand::from(1.5), ops[2]);
    assert_eq!(Some(&crate::name("add")), ops[4].opt_executable_name());
}

#[test]
fn syntax_error() {
    let mut t = Tokenizer::new(b"1 )");
    assert_eq!(Operand::from(1), t.next_operand().unwrap().unwrap());
    assert_eq!(Err(MachineError::SyntaxError), t.next_operand());
}

#[test]
fn unterminated_string_is_syntax_error() {
    let mut t = Tokenizer::new(b"(abc");
    assert_eq!(Err(MachineError::SyntaxError), t.next_operand());
}

#[test]
fn operand_list() {
    let mut l: OperandList = [Operand::from(1), Operand::name("a")].into_iter().collect();
    assert_eq!(Some(Operand::from(1)), l.next_operand().unwrap());
    assert_eq!(Some(Operand::name("a")), l.next_operand().unwrap());
    assert_eq!(None, l.next_operand().unwrap());
}
