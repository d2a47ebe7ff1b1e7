//! # Serialization format
//!
//! The primitive building blocks of the wire format are the tiered varint,
//! the field header, and a handful of fixed-layout scalar payloads.
//!
//! Every unsigned integer that appears on the wire (lengths, counts, headers,
//! integer payloads) is a tiered varint. A varint of tier `k` occupies `k` bytes;
//! the first byte announces `k` with `k - 1` leading one bits followed by a zero bit
//! (tier 9 is announced by `0xFF`). Tiers cover disjoint contiguous ranges,
//! so every integer has exactly one encoding.
//!
//! ```text
//! tier 1:  0xxxxxxx                                  [0, 2^7)
//! tier 2:  10xxxxxx xxxxxxxx                         [2^7, 2^7 + 2^14)
//! tier 3:  110xxxxx xxxxxxxx xxxxxxxx                [.., + 2^21)
//! ...
//! tier 8:  11111110 xxxxxxxx * 7                     [.., + 2^56)
//! tier 9:  11111111 xxxxxxxx * 8                     [.., u64::MAX]
//! ```
//!
//! Struct and choice bodies are sequences of fields. Each field is
//!
//! ```text
//! struct Field {
//!     header:         varint(index << 2 | size_indicator),
//!     payload:        match size_indicator {
//!         0 => [],                                    // unit, zero, false, empty
//!         1 => [u8; 8],                               // non-zero f64
//!         2 => varint,                                // non-zero integers, true
//!         3 => {
//!             payload_len:    varint,
//!             payload_body:   [u8; payload_len],      // bytes, strings, nested bodies
//!         },
//!     },
//! }
//! ```
//!
//! Readers may skip any field by its size indicator without knowing its type.

mod bytes_io;
mod error;
mod header;
mod primitives;
pub mod varint;

pub use bytes_io::*;
pub use error::*;
pub use header::*;
pub use primitives::*;
