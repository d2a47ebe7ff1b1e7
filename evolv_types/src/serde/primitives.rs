use crate::serde::{varint, BytesReader, BytesWriter, DecodeError, SizeIndicator, WriteOverflow};

/// The payload of a fixed-size value in field position.
///
/// Zero-like values (`false`, `0`, `+0.0`) have no payload at all; that is their only
/// valid encoding.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ScalarPayload {
    Empty,
    Varint(u64),
    Fixed8([u8; 8]),
}

impl ScalarPayload {
    pub fn from_bool(b: bool) -> Self {
        if b {
            Self::Varint(1)
        } else {
            Self::Empty
        }
    }

    pub fn from_u64(u: u64) -> Self {
        if u == 0 {
            Self::Empty
        } else {
            Self::Varint(u)
        }
    }

    pub fn from_s64(i: i64) -> Self {
        Self::from_u64(varint::zigzag(i))
    }

    pub fn from_f64(f: f64) -> Self {
        if f.to_bits() == 0 {
            Self::Empty
        } else {
            Self::Fixed8(f.to_le_bytes())
        }
    }

    pub fn indicator(&self) -> SizeIndicator {
        match self {
            Self::Empty => SizeIndicator::Empty,
            Self::Varint(_) => SizeIndicator::Varint,
            Self::Fixed8(_) => SizeIndicator::Fixed8,
        }
    }

    /// Size excluding the field header.
    pub fn size(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Varint(u) => varint::size_u64(*u),
            Self::Fixed8(_) => 8,
        }
    }

    pub fn ser(&self, w: &mut BytesWriter) -> Result<(), WriteOverflow> {
        match self {
            Self::Empty => Ok(()),
            Self::Varint(u) => w.put_varint(*u),
            Self::Fixed8(b) => w.put_fixed8(*b),
        }
    }

    /// Reads the payload announced by `indicator`, rejecting any framing other than the
    /// canonical one for the expected type.
    fn deser_varint(
        indicator: SizeIndicator,
        r: &mut BytesReader,
        expected: &'static str,
    ) -> Result<u64, DecodeError> {
        match indicator {
            SizeIndicator::Empty => Ok(0),
            SizeIndicator::Varint => {
                let u = r.read_varint()?;
                if u == 0 {
                    return Err(DecodeError::non_canonical(format!(
                        "{expected} zero must have an empty payload"
                    )));
                }
                Ok(u)
            }
            _ => Err(DecodeError::WireTypeMismatch {
                indicator,
                expected,
            }),
        }
    }

    pub fn deser_bool(indicator: SizeIndicator, r: &mut BytesReader) -> Result<bool, DecodeError> {
        match Self::deser_varint(indicator, r, "Bool")? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::non_canonical(format!(
                "Bool payload must be 1, got {other}"
            ))),
        }
    }

    pub fn deser_u64(indicator: SizeIndicator, r: &mut BytesReader) -> Result<u64, DecodeError> {
        Self::deser_varint(indicator, r, "U64")
    }

    pub fn deser_s64(indicator: SizeIndicator, r: &mut BytesReader) -> Result<i64, DecodeError> {
        Self::deser_varint(indicator, r, "S64").map(varint::unzigzag)
    }

    pub fn deser_f64(indicator: SizeIndicator, r: &mut BytesReader) -> Result<f64, DecodeError> {
        match indicator {
            SizeIndicator::Empty => Ok(0.0),
            SizeIndicator::Fixed8 => {
                let bits = u64::from_le_bytes(r.read_fixed8()?);
                if bits == 0 {
                    return Err(DecodeError::non_canonical(
                        "F64 +0.0 must have an empty payload",
                    ));
                }
                Ok(f64::from_bits(bits))
            }
            _ => Err(DecodeError::WireTypeMismatch {
                indicator,
                expected: "F64",
            }),
        }
    }
}

/// Reads a `Prefixed` payload, or nothing for `Empty`. A present prefix of zero length is
/// non-canonical because the empty value must use `Empty`.
pub fn deser_prefixed<'a>(
    indicator: SizeIndicator,
    r: &mut BytesReader<'a>,
    expected: &'static str,
) -> Result<BytesReader<'a>, DecodeError> {
    match indicator {
        SizeIndicator::Empty => Ok(BytesReader::new(&[])),
        SizeIndicator::Prefixed => {
            let sub = r.read_prefixed()?;
            if sub.is_empty() {
                return Err(DecodeError::non_canonical(format!(
                    "empty {expected} must have an empty payload"
                )));
            }
            Ok(sub)
        }
        _ => Err(DecodeError::WireTypeMismatch {
            indicator,
            expected,
        }),
    }
}

pub fn deser_utf8(bytes: &[u8]) -> Result<String, DecodeError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
}

/// Skips one payload of any framing. Used for fields and variants the reader does not know.
pub fn skip_payload(indicator: SizeIndicator, r: &mut BytesReader) -> Result<(), DecodeError> {
    match indicator {
        SizeIndicator::Empty => {}
        SizeIndicator::Fixed8 => {
            r.read_fixed8()?;
        }
        SizeIndicator::Varint => {
            r.read_varint()?;
        }
        SizeIndicator::Prefixed => {
            r.read_prefixed()?;
        }
    }
    Ok(())
}
