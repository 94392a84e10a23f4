//! Core adapter traits.
//!
//! This module defines the `DatabaseAdapter` contract every engine adapter
//! implements, the `SchemaIntrospection` extension for catalog lookups, and
//! the value types that cross the adapter boundary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use super::row::Row;
use super::schema::{ColumnInfo, TableInfo};
use super::types::DatabaseType;
use crate::services::database::error::AdapterError;

/// Parameters handed to `connect`.
///
/// For SQLite `dbname` is the file path (or `:memory:`); host, port and
/// credentials are ignored.
#[derive(Debug, Clone, Default)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub dbname: String,
    /// Extra engine-specific options
    pub options: BTreeMap<String, String>,
}

impl ConnectParams {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        dbname: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            dbname: dbname.into(),
            options: BTreeMap::new(),
        }
    }

    /// Parameters for a file-backed engine.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            dbname: path.into(),
            ..Default::default()
        }
    }
}

/// What the verification queries reported after a successful connect.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionInfo {
    pub server_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Engine-specific details, e.g. the SQLite file path and size
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ConnectionInfo {
    pub fn new(server_version: impl Into<String>) -> Self {
        Self {
            server_version: server_version.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, host: &str, port: u16) -> Self {
        self.host = Some(host.to_string());
        self.port = Some(port);
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Outcome of `execute_query`.
///
/// Row-producing statements fill `columns` and `rows`; effectful ones fill
/// `affected_rows`. Failures carry `error` and neither.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub success: bool,
    pub columns: Option<Vec<String>>,
    pub rows: Option<Vec<Row>>,
    pub row_count: usize,
    pub affected_rows: Option<u64>,
    pub message: String,
    pub error: Option<String>,
}

impl QueryResult {
    /// Result of a row-producing statement.
    pub fn rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            success: true,
            columns: Some(columns),
            rows: Some(rows),
            row_count,
            affected_rows: None,
            message: format!("Query executed successfully, {} rows returned", row_count),
            error: None,
        }
    }

    /// Result of an effectful statement.
    pub fn affected(affected_rows: u64) -> Self {
        Self {
            success: true,
            columns: None,
            rows: None,
            row_count: 0,
            affected_rows: Some(affected_rows),
            message: format!("Query executed successfully, {} rows affected", affected_rows),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            columns: None,
            rows: None,
            row_count: 0,
            affected_rows: None,
            message: message.into(),
            error: Some(error.into()),
        }
    }

    /// Returned by an adapter that holds no live handle.
    pub fn not_connected() -> Self {
        Self::failure(
            "Not connected to database",
            "Connect to a database before running queries",
        )
    }

    /// Returned by the connection manager when no adapter is held.
    pub fn no_connection() -> Self {
        Self::failure(
            "No database connection",
            "Use connect_database to connect to a database first",
        )
    }

    /// Wrap a driver error raised while executing a statement.
    pub fn query_failed(err: impl std::fmt::Display) -> Self {
        Self::failure(err.to_string(), "Query execution failed")
    }

    pub fn empty_query() -> Self {
        Self::failure("Empty query", "Provide a SQL statement to execute")
    }
}

/// Contract implemented by every engine adapter.
///
/// An adapter owns at most one native connection. `is_connected` is true
/// only after `connect` has completed its handshake and verification queries.
///
/// # Example
///
/// ```ignore
/// use sqltools_mcp::services::database::drivers::AdapterFactory;
/// use sqltools_mcp::services::database::traits::ConnectParams;
///
/// let mut adapter = AdapterFactory::create("sqlite")?;
/// adapter.connect(&ConnectParams::file(":memory:")).await?;
/// let result = adapter.execute_query("SELECT 1").await;
/// assert!(result.success);
/// ```
#[async_trait]
pub trait DatabaseAdapter: Send {
    /// Get the database type for this adapter
    fn db_type(&self) -> DatabaseType;

    fn is_connected(&self) -> bool;

    /// Establish the native session and verify it.
    ///
    /// A connected adapter tears down its current handle first. On failure
    /// the adapter is left disconnected.
    ///
    /// # Errors
    ///
    /// - `Connection` for handshake, credential or verification failures
    /// - `NotFound` when a required file or driver library is missing
    async fn connect(&mut self, params: &ConnectParams) -> Result<ConnectionInfo, AdapterError>;

    /// Close the handle if present. Idempotent and never fails.
    async fn disconnect(&mut self);

    /// Run one SQL statement. Never fails past this boundary.
    async fn execute_query(&mut self, sql: &str) -> QueryResult;
}

/// Catalog lookups. Best effort: failures yield empty listings.
#[async_trait]
pub trait SchemaIntrospection: DatabaseAdapter {
    /// List tables (and views where the engine reports them) in `schema`,
    /// or in the engine's default namespace.
    async fn list_tables(&mut self, schema: Option<&str>) -> Vec<TableInfo>;

    /// Describe the columns of `table`, in ordinal order.
    async fn describe_table(&mut self, table: &str, schema: Option<&str>) -> Vec<ColumnInfo>;
}

/// A boxed adapter trait object.
pub type BoxedAdapter = Box<dyn SchemaIntrospection>;
