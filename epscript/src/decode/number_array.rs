use super::DecodeError;
use winnow::{
    binary::{f32 as float32, i16 as int16, i32 as int32, u16 as uint16, Endianness},
    error::ContextError,
    Parser,
};

/// Token type of homogeneous number arrays, the high byte of the header code.
const HNA_TOKEN: u8 = 149;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Representation {
    Fixed32 { scale: u32 },
    Fixed16 { scale: u32 },
    Real32,
}

fn representation(code: u16) -> Result<(Representation, Endianness), DecodeError> {
    let [token, r] = code.to_be_bytes();
    if token != HNA_TOKEN {
        return Err(DecodeError::InvalidNumberArray("not a number array"));
    }
    let endian = if r < 128 {
        Endianness::Big
    } else {
        Endianness::Little
    };
    let repr = match r & 0x7f {
        r @ 0..=31 => Representation::Fixed32 { scale: r.into() },
        r @ 32..=47 => Representation::Fixed16 {
            scale: (r - 32).into(),
        },
        48 | 49 => Representation::Real32,
        _ => return Err(DecodeError::InvalidNumberArray("unknown representation")),
    };
    Ok((repr, endian))
}

/// Decode a homogeneous number array (encoded number string).
///
/// Header is 4 bytes: representation code as big-endian u16, then element
/// count in the byte order of the representation. Fixed point elements are
/// divided by `2^scale`.
pub fn decode(data: &[u8]) -> Result<Vec<f64>, DecodeError> {
    fn truncated(_: winnow::error::ErrMode<ContextError>) -> DecodeError {
        DecodeError::InvalidNumberArray("truncated data")
    }

    let mut input = data;
    let code = uint16(Endianness::Big)
        .parse_next(&mut input)
        .map_err(truncated)?;
    let (repr, endian) = representation(code)?;
    let count = uint16(endian).parse_next(&mut input).map_err(truncated)?;

    let mut r = Vec::with_capacity(count.into());
    for _ in 0..count {
        let v = match repr {
            Representation::Fixed32 { scale } => {
                let v = int32(endian).parse_next(&mut input).map_err(truncated)?;
                f64::from(v) / f64::from(1u32 << scale)
            }
            Representation::Fixed16 { scale } => {
                let v = int16(endian).parse_next(&mut input).map_err(truncated)?;
                f64::from(v) / f64::from(1u32 << scale)
            }
            Representation::Real32 => {
                f64::from(float32(endian).parse_next(&mut input).map_err(truncated)?)
            }
        };
        r.push(v);
    }
    Ok(r)
}
