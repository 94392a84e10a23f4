//! DM8 (Dameng) adapter.
//!
//! Talks to the server through the vendor's ODBC driver library, which is
//! located on disk when the adapter is created.

mod connection;
pub mod discovery;
mod schema;
mod types;

pub use connection::{DmAdapter, connection_string};
