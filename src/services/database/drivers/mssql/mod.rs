//! SQL Server adapter.
//!
//! Uses Tiberius (TDS 7.3, rustls) on a single client connection.

mod connection;
mod schema;
mod types;

pub use connection::MssqlAdapter;
