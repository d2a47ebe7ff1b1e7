//! The encode/decode engine: plan sizes, write in one pass, read with fallback resolution,
//! and judge whether two schema versions can exchange messages.

pub mod atlas;
pub mod codec;
pub mod config;
pub mod evolution;

pub use atlas::{PlanningError, SizePlan};
pub use codec::Codec;
pub use config::DecodeLimits;
pub use evolv_types::serde::DecodeError;
