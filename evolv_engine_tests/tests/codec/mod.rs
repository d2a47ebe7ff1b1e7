pub mod circular_dependency;
pub mod comprehensive;
pub mod properties;
pub mod schema_evolution;
