//! Pure decoders for the binary encodings found in PostScript data:
//! base-85 strings, homogeneous number arrays and bit-packed samples.

mod ascii85;
mod number_array;
mod samples;

pub use ascii85::decode as decode_ascii85;
pub use number_array::decode as decode_number_array;
pub use samples::decode as decode_samples;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base-85 character: {0:#04x}")]
    InvalidBase85Char(u8),
    #[error("`z` inside a base-85 group")]
    MisplacedZ,
    #[error("base-85 group overflows 32 bits")]
    Base85Overflow,
    #[error("base-85 data ends with a single character group")]
    TruncatedGroup,
    #[error("invalid homogeneous number array: {0}")]
    InvalidNumberArray(&'static str),
    #[error("unsupported bits per sample: {0}")]
    UnsupportedBitsPerSample(u32),
}

/// Decode hex string body. The tokenizer already converted hex digit pairs,
/// so each byte of the string is taken as is.
pub fn decode_hex_string(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}
