pub mod schema;
pub mod serde;
pub mod value;
