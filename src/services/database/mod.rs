//! Database access layer.
//!
//! - `traits`: the adapter contract and the values it exchanges
//! - `drivers`: one adapter per engine plus the factory
//! - `manager`: the single live connection the tools operate on

pub mod drivers;
pub mod error;
mod manager;
pub mod traits;

pub use error::AdapterError;
pub use manager::ConnectionManager;
