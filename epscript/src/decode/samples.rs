use super::DecodeError;
use bitstream_io::{BigEndian, BitRead, BitReader};

/// Unpack samples of `bits_per_sample` bits into values normalized to [0, 1].
///
/// Samples are read big-endian first, sub-byte samples from the high bits of
/// each byte. Trailing bits that do not form a whole sample are ignored.
/// 12 bit samples are not supported.
pub fn decode(data: &[u8], bits_per_sample: u32) -> Result<Vec<f64>, DecodeError> {
    if !matches!(bits_per_sample, 1 | 2 | 4 | 8 | 16 | 24 | 32) {
        return Err(DecodeError::UnsupportedBitsPerSample(bits_per_sample));
    }

    let max = ((1u64 << bits_per_sample) - 1) as f64;
    let n = data.len() * 8 / bits_per_sample as usize;
    let mut reader = BitReader::endian(data, BigEndian);
    let mut r = Vec::with_capacity(n);
    for _ in 0..n {
        // reading inside the computed sample count never hits eof
        let Ok(v) = reader.read::<u32>(bits_per_sample) else {
            break;
        };
        r.push(f64::from(v) / max);
    }
    Ok(r)
}
