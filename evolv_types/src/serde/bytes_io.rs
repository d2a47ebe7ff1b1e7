use crate::serde::{varint, DecodeError, FieldHeader};
use derive_more::Deref;
use thiserror::Error;

/// Returned when a write would run past the end of the caller's storage.
#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
#[error("write of {needed} bytes overflows {remaining} remaining")]
pub struct WriteOverflow {
    pub needed: usize,
    pub remaining: usize,
}

/// The offset just past the last written byte.
#[derive(Deref, PartialEq, Eq, Clone, Copy, Debug)]
pub struct WriteLen(usize);

/// Writes into caller-owned storage that was sized before writing began.
/// Never reallocates.
pub struct BytesWriter<'a> {
    buf: &'a mut [u8],
    off: usize,
}

impl<'a> BytesWriter<'a> {
    pub fn new(buf: &'a mut [u8], off: usize) -> Self {
        Self { buf, off }
    }

    pub fn offset(&self) -> WriteLen {
        WriteLen(self.off)
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.off)
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), WriteOverflow> {
        let remaining = self.remaining();
        if bytes.len() > remaining {
            return Err(WriteOverflow {
                needed: bytes.len(),
                remaining,
            });
        }
        self.buf[self.off..self.off + bytes.len()].copy_from_slice(bytes);
        self.off += bytes.len();
        Ok(())
    }

    pub fn put_varint(&mut self, value: u64) -> Result<(), WriteOverflow> {
        let (buf, len) = varint::encode_u64_array(value);
        self.put_bytes(&buf[..len])
    }

    pub fn put_header(&mut self, header: FieldHeader) -> Result<(), WriteOverflow> {
        self.put_varint(header.to_raw())
    }

    pub fn put_fixed8(&mut self, bytes: [u8; 8]) -> Result<(), WriteOverflow> {
        self.put_bytes(&bytes)
    }
}

/// Reads a bounded span. Sub-spans are split off so that a nested body can never
/// read past its length prefix.
#[derive(Clone, Debug)]
pub struct BytesReader<'a> {
    buf: &'a [u8],
    off: usize,
}

impl<'a> BytesReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, off: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.off)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn offset(&self) -> usize {
        self.off
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(DecodeError::TruncatedInput {
                needed: len,
                remaining,
            });
        }
        let start = self.off;
        self.off += len;
        Ok(&self.buf[start..start + len])
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let (value, len) = varint::decode_u64(&self.buf[self.off..])?;
        self.off += len;
        Ok(value)
    }

    pub fn read_header(&mut self) -> Result<FieldHeader, DecodeError> {
        FieldHeader::from_raw(self.read_varint()?)
    }

    pub fn read_fixed8(&mut self) -> Result<[u8; 8], DecodeError> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.read_bytes(8)?);
        Ok(out)
    }

    /// Reads `varint(len)` then splits off the next `len` bytes as their own reader.
    pub fn read_prefixed(&mut self) -> Result<BytesReader<'a>, DecodeError> {
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::TruncatedInput {
            needed: usize::MAX,
            remaining: self.remaining(),
        })?;
        Ok(BytesReader::new(self.read_bytes(len)?))
    }
}
