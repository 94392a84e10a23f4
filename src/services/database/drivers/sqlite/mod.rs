//! SQLite adapter.
//!
//! Wraps a single SQLx `SqliteConnection`. `dbname` is the database file
//! path, which must already exist, or `:memory:` for a private in-memory
//! database.
//!
//! # Example
//!
//! ```ignore
//! use sqltools_mcp::services::database::drivers::sqlite::SqliteAdapter;
//! use sqltools_mcp::services::database::traits::{ConnectParams, DatabaseAdapter};
//!
//! let mut adapter = SqliteAdapter::new();
//! adapter.connect(&ConnectParams::file("/var/data/app.db")).await?;
//! ```

mod connection;
mod schema;
mod types;

pub use connection::{MEMORY_PATH, SqliteAdapter};
