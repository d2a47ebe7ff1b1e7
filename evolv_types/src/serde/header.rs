use crate::serde::{varint, DecodeError};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};

/// Field indices must leave room for the two indicator bits.
pub const MAX_FIELD_INDEX: u64 = u64::MAX >> 2;

const INDICATOR_BITS: u32 = 2;
const INDICATOR_MASK: u64 = 0b11;

/// How a field's payload is framed. This is all a reader needs to skip a field
/// whose index it does not know.
#[repr(u8)]
#[derive(PartialEq, Eq, Hash, Clone, Copy, FromPrimitive, ToPrimitive, Debug)]
pub enum SizeIndicator {
    Empty = 0,
    Fixed8 = 1,
    Varint = 2,
    Prefixed = 3,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct FieldHeader {
    pub index: u64,
    pub indicator: SizeIndicator,
}

impl FieldHeader {
    pub fn new(index: u64, indicator: SizeIndicator) -> Self {
        Self { index, indicator }
    }

    pub fn to_raw(self) -> u64 {
        let indicator = self.indicator.to_u64().unwrap_or_default();
        (self.index << INDICATOR_BITS) | indicator
    }

    pub fn from_raw(raw: u64) -> Result<Self, DecodeError> {
        let indicator =
            SizeIndicator::from_u64(raw & INDICATOR_MASK).ok_or(DecodeError::MalformedVarint {
                detail: "field header has an unknown size indicator",
            })?;
        Ok(Self {
            index: raw >> INDICATOR_BITS,
            indicator,
        })
    }

    pub fn size(self) -> usize {
        varint::size_u64(self.to_raw())
    }
}
