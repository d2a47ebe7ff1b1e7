//! Tiered, canonical variable-width integers.
//!
//! Tier `k` (1-based) holds the values in `[base(k), base(k + 1))`, where
//! `base(1) = 0` and `base(k) = 2^7 + 2^14 + ... + 2^(7(k-1))`.
//! The final tier holds everything from `base(9)` up to `u64::MAX`.

use crate::serde::{DecodeError, WriteOverflow};


pub const MAX_VARINT_LEN: usize = 9;

/// `TIER_BASES[k - 1] == base(k)`.
const TIER_BASES: [u64; MAX_VARINT_LEN] = {
    let mut bases = [0u64; MAX_VARINT_LEN];
    let mut k = 1;
    while k < MAX_VARINT_LEN {
        bases[k] = bases[k - 1] + (1u64 << (7 * k));
        k += 1;
    }
    bases
};

/// Largest offset the final tier may carry.
const MAX_FINAL_TIER_OFFSET: u64 = u64::MAX - TIER_BASES[MAX_VARINT_LEN - 1];

/// The lowest value encoded with `len` bytes.
pub fn tier_base(len: usize) -> Option<u64> {
    TIER_BASES.get(len.checked_sub(1)?).copied()
}

pub fn size_u64(value: u64) -> usize {
    TIER_BASES[1..]
        .iter()
        .position(|&next_base| value < next_base)
        .map_or(MAX_VARINT_LEN, |i| i + 1)
}

pub fn size_s64(value: i64) -> usize {
    size_u64(zigzag(value))
}

/// Encodes into a stack buffer. Only the first `len` bytes are meaningful.
pub fn encode_u64_array(value: u64) -> ([u8; MAX_VARINT_LEN], usize) {
    let len = size_u64(value);
    let offset = value - TIER_BASES[len - 1];

    let mut buf = [0u8; MAX_VARINT_LEN];
    if len == MAX_VARINT_LEN {
        buf[0] = 0xFF;
        buf[1..].copy_from_slice(&offset.to_be_bytes());
    } else {
        let be = offset.to_be_bytes();
        buf[..len].copy_from_slice(&be[be.len() - len..]);
        // `len - 1` one bits, then a zero bit.
        let prefix = !(0xFFu8 >> (len - 1));
        buf[0] |= prefix;
    }
    (buf, len)
}

pub fn encode_u64(value: u64) -> Vec<u8> {
    let (buf, len) = encode_u64_array(value);
    buf[..len].to_vec()
}

pub fn encode_s64(value: i64) -> Vec<u8> {
    encode_u64(zigzag(value))
}

/// Writes at the start of `buf` and returns the count of bytes written.
pub fn write_u64(value: u64, buf: &mut [u8]) -> Result<usize, WriteOverflow> {
    let (encoded, len) = encode_u64_array(value);
    let remaining = buf.len();
    let dst = buf.get_mut(..len).ok_or(WriteOverflow {
        needed: len,
        remaining,
    })?;
    dst.copy_from_slice(&encoded[..len]);
    Ok(len)
}

pub fn write_s64(value: i64, buf: &mut [u8]) -> Result<usize, WriteOverflow> {
    write_u64(zigzag(value), buf)
}

/// Returns the decoded value and the count of bytes consumed.
pub fn decode_u64(buf: &[u8]) -> Result<(u64, usize), DecodeError> {
    let first = *buf.first().ok_or(DecodeError::TruncatedInput {
        needed: 1,
        remaining: 0,
    })?;

    let len = if first == 0xFF {
        MAX_VARINT_LEN
    } else {
        first.leading_ones() as usize + 1
    };
    if buf.len() < len {
        return Err(DecodeError::TruncatedInput {
            needed: len,
            remaining: buf.len(),
        });
    }

    let offset = if len == MAX_VARINT_LEN {
        let mut be = [0u8; 8];
        be.copy_from_slice(&buf[1..MAX_VARINT_LEN]);
        let offset = u64::from_be_bytes(be);
        if offset > MAX_FINAL_TIER_OFFSET {
            return Err(DecodeError::MalformedVarint {
                detail: "final-tier offset exceeds the 64-bit range",
            });
        }
        offset
    } else {
        // Tier 8 leaves no value bits in the first byte.
        let mask = 0xFFu8.checked_shr(len as u32).unwrap_or(0);
        let head = u64::from(first & mask);
        buf[1..len]
            .iter()
            .fold(head, |acc, &byte| (acc << 8) | u64::from(byte))
    };

    Ok((TIER_BASES[len - 1] + offset, len))
}

pub fn decode_s64(buf: &[u8]) -> Result<(i64, usize), DecodeError> {
    let (raw, len) = decode_u64(buf)?;
    Ok((unzigzag(raw), len))
}

pub fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
