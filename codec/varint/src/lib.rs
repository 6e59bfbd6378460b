//! Minimal big-endian variable length integers.
//!
//! An unsigned value below 128 is a single byte holding the value. Larger
//! values start with a byte holding the negated byte count (`-n` as `u8`)
//! followed by `n` big-endian magnitude bytes, with leading zero bytes
//! dropped. A `u64` therefore needs at most [`MAX_LEN`] bytes.
//!
//! Signed values are folded into an unsigned value before encoding: bit 0
//! carries the sign, the remaining bits the magnitude (complemented for
//! negative values, so `-1` becomes `1`).

use std::fmt;

/// Maximum number of bytes an encoded `u64` occupies.
pub const MAX_LEN: usize = 9;

/// Largest value that is written as a single byte.
pub const SINGLE_BYTE_MAX: u64 = 0x7f;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// The input ended before the value was complete.
    UnexpectedEnd { needed: usize, available: usize },
    /// The length byte announces more magnitude bytes than a `u64` holds.
    Overflow { byte_count: usize },
}

impl fmt::Display for VarintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarintError::UnexpectedEnd { needed, available } => {
                write!(f, "varint needs {} bytes, only {} available", needed, available)
            }
            VarintError::Overflow { byte_count } => {
                write!(f, "varint of {} bytes exceeds 64 bits", byte_count)
            }
        }
    }
}

impl std::error::Error for VarintError {}

/// Fixed size scratch space holding one encoded value.
///
/// The encoding is right-aligned in the array so the prefix can be copied
/// as a single slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    bytes: [u8; MAX_LEN],
    start: usize,
}

impl Encoded {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[self.start..]
    }

    pub fn len(&self) -> usize {
        MAX_LEN - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encode `value` without touching the heap.
pub fn encode_uint_array(value: u64) -> Encoded {
    let mut bytes = [0u8; MAX_LEN];
    if value <= SINGLE_BYTE_MAX {
        bytes[MAX_LEN - 1] = value as u8;
        return Encoded {
            bytes,
            start: MAX_LEN - 1,
        };
    }

    bytes[1..].copy_from_slice(&value.to_be_bytes());
    let leading_zeros = (value.leading_zeros() / 8) as usize;
    let byte_count = 8 - leading_zeros;
    let start = MAX_LEN - byte_count - 1;
    bytes[start] = (byte_count as u8).wrapping_neg();

    Encoded { bytes, start }
}

/// Append the minimal encoding of `value` to `buf`.
pub fn encode_uint(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(encode_uint_array(value).as_bytes());
}

/// Fold a signed value into the unsigned form used on the wire.
pub fn fold_int(value: i64) -> u64 {
    if value < 0 {
        ((!value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    }
}

/// Inverse of [`fold_int`].
pub fn unfold_int(folded: u64) -> i64 {
    let magnitude = (folded >> 1) as i64;
    if folded & 1 == 1 {
        !magnitude
    } else {
        magnitude
    }
}

/// Append the encoding of a signed value to `buf`.
pub fn encode_int(buf: &mut Vec<u8>, value: i64) {
    encode_uint(buf, fold_int(value));
}

/// Number of bytes [`encode_uint`] appends for `value`.
pub fn uint_len(value: u64) -> usize {
    if value <= SINGLE_BYTE_MAX {
        1
    } else {
        1 + 8 - (value.leading_zeros() / 8) as usize
    }
}

/// Number of bytes [`encode_int`] appends for `value`.
pub fn int_len(value: i64) -> usize {
    uint_len(fold_int(value))
}

/// Decode one unsigned value from the front of `input`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_uint(input: &[u8]) -> Result<(u64, usize), VarintError> {
    let first = *input.first().ok_or(VarintError::UnexpectedEnd {
        needed: 1,
        available: 0,
    })?;
    if u64::from(first) <= SINGLE_BYTE_MAX {
        return Ok((u64::from(first), 1));
    }

    let byte_count = usize::from(first.wrapping_neg());
    if byte_count > 8 {
        return Err(VarintError::Overflow { byte_count });
    }
    if input.len() < byte_count + 1 {
        return Err(VarintError::UnexpectedEnd {
            needed: byte_count + 1,
            available: input.len(),
        });
    }

    let value = input[1..=byte_count]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    Ok((value, byte_count + 1))
}

/// Decode one signed value from the front of `input`.
pub fn decode_int(input: &[u8]) -> Result<(i64, usize), VarintError> {
    let (folded, used) = decode_uint(input)?;
    Ok((unfold_int(folded), used))
}
