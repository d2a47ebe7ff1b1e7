use crate::serde::SizeIndicator;
use thiserror::Error;

/// Every way a byte span can fail to decode under the reader's schema.
#[derive(Error, PartialEq, Eq, Clone, Debug)]
pub enum DecodeError {
    /// A field the reader declares `Required` was not in the body.
    #[error("required field `{field}` of `{type_name}` is missing")]
    MissingRequiredField {
        type_name: String,
        field: String,
    },

    /// No entry of a choice body named a variant the reader knows.
    #[error("choice `{type_name}` ended at unrecognized variant {index} without a fallback")]
    UnrecognizedVariantWithoutFallback { type_name: String, index: u64 },

    /// A length or fixed-width read ran past the end of the span.
    #[error("truncated input: needed {needed} bytes, {remaining} remain")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("malformed varint: {detail}")]
    MalformedVarint { detail: &'static str },

    /// A unit array announced more elements than the reader will materialize.
    #[error("array of {len} elements exceeds the limit of {max}")]
    ArrayTooLong { len: u64, max: usize },

    #[error("nesting depth exceeds the limit of {max}")]
    NestingTooDeep { max: usize },

    /// The bytes describe a valid value, but not in its one canonical form.
    #[error("non-canonical encoding: {detail}")]
    NonCanonical { detail: String },

    #[error("size indicator {indicator:?} cannot carry a {expected} payload")]
    WireTypeMismatch {
        indicator: SizeIndicator,
        expected: &'static str,
    },

    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
}

impl DecodeError {
    pub fn non_canonical<S: Into<String>>(detail: S) -> Self {
        Self::NonCanonical {
            detail: detail.into(),
        }
    }
}
