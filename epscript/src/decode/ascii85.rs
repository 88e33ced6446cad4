use super::DecodeError;

/// Decode base-85 data, optionally wrapped in `<~` and `~>`.
///
/// White space is ignored. `z` stands for four zero bytes and is only legal
/// at a group boundary. A final group of n (2..=4) characters is padded with
/// `u` and yields n - 1 bytes.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let data = data.strip_prefix(b"<~").unwrap_or(data);
    let mut out = Vec::with_capacity((data.len() + 4) / 5 * 4);

    let mut group = [0u8; 5];
    let mut group_len = 0;
    for &b in data
        .iter()
        .filter(|&&b| !matches!(b, b' ' | b'\n' | b'\r' | b'\t' | b'\x0c' | b'\0'))
        .take_while(|&&b| b != b'~')
    {
        match b {
            b'z' if group_len == 0 => out.extend_from_slice(&[0; 4]),
            b'z' => return Err(DecodeError::MisplacedZ),
            b'!'..=b'u' => {
                group[group_len] = b - b'!';
                group_len += 1;
                if group_len == 5 {
                    out.extend_from_slice(&word_85(group)?);
                    group_len = 0;
                }
            }
            _ => return Err(DecodeError::InvalidBase85Char(b)),
        }
    }

    match group_len {
        0 => {}
        1 => return Err(DecodeError::TruncatedGroup),
        n => {
            group[n..].fill(b'u' - b'!');
            let last = word_85(group)?;
            out.extend_from_slice(&last[..n - 1]);
        }
    }
    Ok(out)
}

fn word_85(digits: [u8; 5]) -> Result<[u8; 4], DecodeError> {
    let q = digits
        .iter()
        .fold(0u64, |acc, &d| acc * 85 + u64::from(d));
    u32::try_from(q)
        .map(u32::to_be_bytes)
        .map_err(|_| DecodeError::Base85Overflow)
}
