//! MySQL adapter.
//!
//! Wraps a single SQLx `MySqlConnection` and works with MariaDB as well.
//!
//! # Example
//!
//! ```ignore
//! use sqltools_mcp::services::database::drivers::mysql::MySqlAdapter;
//! use sqltools_mcp::services::database::traits::{ConnectParams, DatabaseAdapter};
//!
//! let mut adapter = MySqlAdapter::new();
//! let params = ConnectParams::new("localhost", 3306, "root", "password", "mydb");
//! let info = adapter.connect(&params).await?;
//! println!("{}", info.server_version);
//! ```

mod connection;
mod schema;
mod types;

pub use connection::MySqlAdapter;
