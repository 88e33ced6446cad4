//! Tokenizer turning PostScript text into operands.
//!
//! `{`, `}`, `[`, `]`, `<<` and `>>` are yielded as executable names, the
//! machine builds procedures, arrays and dictionaries from them.

use crate::{
    operand::{Operand, PsString, StringEncoding},
    MachineError, MachineResult,
};
use either::Either;
use log::error;
use std::str::from_utf8;
use winnow::{
    ascii::hex_digit1,
    combinator::{alt, delimited, preceded, repeat},
    error::{ContextError, ErrMode},
    stream::{AsChar, Stream},
    token::{any, literal, take_till, take_while},
    PResult, Parser,
};

/// Pull based source of operands, read by [`crate::Machine::run()`].
pub trait OperandSource {
    /// Next operand, `None` at end of input.
    fn next_operand(&mut self) -> MachineResult<Option<Operand>>;
}

/// Operands prepared by code.
#[derive(Debug, Default)]
pub struct OperandList(std::vec::IntoIter<Operand>);

impl OperandList {
    pub fn new(operands: Vec<Operand>) -> Self {
        Self(operands.into_iter())
    }
}

impl FromIterator<Operand> for OperandList {
    fn from_iter<T: IntoIterator<Item = Operand>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl OperandSource for OperandList {
    fn next_operand(&mut self) -> MachineResult<Option<Operand>> {
        Ok(self.0.next())
    }
}

/// Tokenizer over PostScript text.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a [u8],
}

impl<'a> Tokenizer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { input: data }
    }

    /// Input not consumed yet.
    pub fn remains(&self) -> &'a [u8] {
        self.input
    }
}

impl OperandSource for Tokenizer<'_> {
    fn next_operand(&mut self) -> MachineResult<Option<Operand>> {
        skip_white_space_and_comments(&mut self.input);
        if self.input.is_empty() {
            return Ok(None);
        }
        token.parse_next(&mut self.input).map(Some).map_err(|_| {
            let n = self.input.len().min(20);
            error!(
                "syntax error near: {}",
                String::from_utf8_lossy(&self.input[..n])
            );
            MachineError::SyntaxError
        })
    }
}

fn backtrack<T>() -> PResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

fn comment(input: &mut &[u8]) -> PResult<()> {
    preceded(
        b'%',
        take_till(0.., |c| c == b'\n' || c == b'\r' || c == b'\x0c'),
    )
    .void()
    .parse_next(input)
}

/// 0x0, 0x9, 0x0A, 0x0C, 0x0D, 0x20
fn is_white_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0c' | b'\r' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// not white space and delimiter
fn is_regular_char(b: u8) -> bool {
    !is_white_space(b) && !is_delimiter(b)
}

fn white_space<'a>(input: &mut &'a [u8]) -> PResult<&'a [u8]> {
    take_while(1.., is_white_space).parse_next(input)
}

fn skip_white_space_and_comments(input: &mut &[u8]) {
    let r: PResult<()> = repeat(0.., alt((white_space.void(), comment))).parse_next(input);
    // repeat(0..) of parsers that never succeed on empty input cannot fail
    debug_assert!(r.is_ok());
}

/// Parse regular characters as number: integer, real or `radix#digits`.
fn parse_number(buf: &[u8]) -> Option<Either<i32, f64>> {
    let s = from_utf8(buf).ok()?;
    if let Some((radix, digits)) = s.split_once('#') {
        let radix = radix.parse::<u32>().ok().filter(|r| (2..=36).contains(r))?;
        // radix numbers are unsigned, 16#FFFFFFFF is -1
        #[allow(clippy::cast_possible_wrap)]
        return u32::from_str_radix(digits, radix)
            .ok()
            .map(|v| Either::Left(v as i32));
    }
    if !buf.iter().any(u8::is_ascii_digit)
        || !buf
            .iter()
            .all(|c| c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    if buf.iter().any(|c| matches!(c, b'.' | b'e' | b'E')) {
        return s.parse::<f64>().ok().map(Either::Right);
    }
    match s.parse::<i32>() {
        Ok(v) => Some(Either::Left(v)),
        // integer overflow becomes real
        Err(_) => s.parse::<f64>().ok().map(Either::Right),
    }
}

fn int_or_float(input: &mut &[u8]) -> PResult<Either<i32, f64>> {
    let checkpoint = input.checkpoint();
    let buf = take_while(1.., is_regular_char).parse_next(input)?;
    match parse_number(buf) {
        Some(v) => Ok(v),
        None => {
            input.reset(&checkpoint);
            backtrack()
        }
    }
}

fn literal_string(input: &mut &[u8]) -> PResult<Vec<u8>> {
    fn oct_byte(input: &mut &[u8]) -> PResult<u8> {
        let buf = take_while(1..=3, AsChar::is_oct_digit).parse_next(input)?;
        let v = buf
            .iter()
            .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
        // high order overflow is ignored
        Ok(v.to_be_bytes()[3])
    }

    /// Escape sequence after `\`, `None` for escaped line end.
    fn escape(input: &mut &[u8]) -> PResult<Option<u8>> {
        if input.first().is_some_and(|c| c.is_oct_digit()) {
            return oct_byte.map(Some).parse_next(input);
        }
        let c = any.parse_next(input)?;
        Ok(match c {
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'b' => Some(b'\x08'),
            b'f' => Some(b'\x0c'),
            b'\r' => {
                if input.first() == Some(&b'\n') {
                    input.next_token();
                }
                None
            }
            b'\n' => None,
            // unknown escape, backslash is ignored
            c => Some(c),
        })
    }

    fn body(input: &mut &[u8], r: &mut Vec<u8>) -> PResult<()> {
        loop {
            let part = take_till(0.., (b'(', b')', b'\\')).parse_next(input)?;
            r.extend_from_slice(part);
            match input.first() {
                Some(b'\\') => {
                    input.next_token();
                    if let Some(c) = escape(input)? {
                        r.push(c);
                    }
                }
                Some(b'(') => {
                    input.next_token();
                    r.push(b'(');
                    body(input, r)?;
                    b')'.parse_next(input)?;
                    r.push(b')');
                }
                Some(_) => return Ok(()),
                // unterminated string
                None => return backtrack(),
            }
        }
    }

    b'('.parse_next(input)?;
    let mut r = vec![];
    body(input, &mut r)?;
    b')'.parse_next(input)?;
    Ok(r)
}

/// `<hex digits>`, white space ignored, missing last digit is 0.
fn hex_string(input: &mut &[u8]) -> PResult<Vec<u8>> {
    let parts: Vec<&[u8]> = delimited(
        b'<',
        repeat(0.., alt((hex_digit1, white_space))),
        b'>',
    )
    .parse_next(input)?;
    let mut digits: Vec<u8> = parts
        .into_iter()
        .filter(|p| !p.first().copied().is_some_and(is_white_space))
        .flatten()
        .copied()
        .collect();
    if digits.len() % 2 != 0 {
        digits.push(b'0');
    }
    let hex = |c: u8| match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => c - b'A' + 10,
    };
    Ok(digits
        .chunks_exact(2)
        .map(|p| (hex(p[0]) << 4) | hex(p[1]))
        .collect())
}

/// `<~base85~>`, kept encoded.
fn base85_string<'a>(input: &mut &'a [u8]) -> PResult<&'a [u8]> {
    delimited(literal(b"<~"), take_till(0.., b'~'), literal(b"~>")).parse_next(input)
}

fn string(input: &mut &[u8]) -> PResult<PsString> {
    alt((
        literal_string.map(PsString::literal),
        base85_string.map(|s| PsString::new(s.to_vec(), StringEncoding::Base85)),
        hex_string.map(|s| PsString::new(s, StringEncoding::Hex)),
    ))
    .parse_next(input)
}

fn executable_name<'a>(input: &mut &'a [u8]) -> PResult<&'a [u8]> {
    take_while(1.., is_regular_char).parse_next(input)
}

/// `/name`, `//name` is taken as executable name.
fn literal_name(input: &mut &[u8]) -> PResult<Operand> {
    b'/'.parse_next(input)?;
    let immediate = input.first() == Some(&b'/');
    if immediate {
        input.next_token();
    }
    let name = take_while(0.., is_regular_char).parse_next(input)?;
    let name = String::from_utf8_lossy(name);
    Ok(if immediate {
        Operand::executable_name(&name)
    } else {
        Operand::name(&name)
    })
}

/// `[`, `]`, `{`, `}`, `<<` and `>>`.
fn special_name<'a>(input: &mut &'a [u8]) -> PResult<&'a [u8]> {
    let n = match **input {
        [b'<', b'<', ..] | [b'>', b'>', ..] => 2,
        [b'[' | b']' | b'{' | b'}', ..] => 1,
        _ => return backtrack(),
    };
    Ok(input.next_slice(n))
}

pub(crate) fn token(input: &mut &[u8]) -> PResult<Operand> {
    alt((
        string.map(Operand::string),
        literal_name,
        special_name.map(|s| Operand::executable_name(&String::from_utf8_lossy(s))),
        int_or_float.map(Operand::from),
        executable_name.map(|s| Operand::executable_name(&String::from_utf8_lossy(s))),
    ))
    .parse_next(input)
}

#[cfg(test)]
mod tests;
