pub mod env;
pub mod geo;
pub mod serde;
