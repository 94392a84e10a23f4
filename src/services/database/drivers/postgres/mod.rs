//! PostgreSQL adapter.
//!
//! Wraps a single SQLx `PgConnection`. Catalog lookups default to the
//! `public` schema.
//!
//! # Example
//!
//! ```ignore
//! use sqltools_mcp::services::database::drivers::postgres::PostgresAdapter;
//! use sqltools_mcp::services::database::traits::{ConnectParams, DatabaseAdapter};
//!
//! let mut adapter = PostgresAdapter::new();
//! let params = ConnectParams::new("localhost", 5432, "user", "password", "mydb");
//! adapter.connect(&params).await?;
//! ```

mod connection;
mod schema;
mod types;

pub use connection::PostgresAdapter;
pub use types::format_interval;
