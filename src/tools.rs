//! The five database tools exposed to MCP clients.
//!
//! Each tool takes JSON arguments and answers with a JSON object. Failures are
//! reported inside that object (`success: false`) rather than as protocol
//! errors; only an unknown tool name or malformed arguments produce a
//! `ToolError`.

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::services::database::drivers::AdapterFactory;
use crate::services::database::error::AdapterError;
use crate::services::database::traits::DatabaseType;
use crate::services::database::ConnectionManager;

pub const CONNECT_DATABASE: &str = "connect_database";
pub const EXECUTE_SQL: &str = "execute_sql";
pub const LIST_TABLES: &str = "list_tables";
pub const DESCRIBE_TABLE: &str = "describe_table";
pub const GET_CONNECTION_STATUS: &str = "get_connection_status";

const DEFAULT_LIMIT: i64 = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Deserialize)]
pub struct ConnectArgs {
    pub dbtype: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub dbname: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteArgs {
    pub query: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Deserialize)]
pub struct ListTablesArgs {
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct DescribeArgs {
    pub table_name: String,
    #[serde(default)]
    pub schema: Option<String>,
}

/// Page bounds `[start, end)` over `total` items.
///
/// A negative offset starts at 0, a negative limit yields an empty page and
/// both ends are clamped to `total`.
pub fn paginate(total: usize, offset: i64, limit: i64) -> (usize, usize) {
    let start = usize::try_from(offset.max(0)).unwrap_or(usize::MAX).min(total);
    let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
    let end = start.saturating_add(limit).min(total);
    (start, end)
}

fn not_connected() -> Value {
    json!({
        "success": false,
        "error": "Database not connected",
        "message": "Please connect to a database using connect_database first",
        "suggestions": ["Use connect_database tool to establish a connection"],
    })
}

fn connect_suggestions(db_type: DatabaseType, err: &AdapterError) -> Vec<String> {
    if let AdapterError::DependencyMissing { feature, .. } = err {
        return vec![format!(
            "Rebuild sqltools-mcp with the '{}' cargo feature enabled",
            feature
        )];
    }

    match db_type {
        DatabaseType::Sqlite => vec![
            "Check if the database file path exists".to_string(),
            "Verify file permissions".to_string(),
        ],
        DatabaseType::Dm8 if matches!(err, AdapterError::NotFound(_)) => vec![
            "Set DM_ODBC_DRIVER to the full path of the DM ODBC driver library".to_string(),
            "Or set DM_HOME to the DM installation directory".to_string(),
        ],
        _ => vec![
            "Verify the host address is correct".to_string(),
            "Check if the port is accessible and not blocked by a firewall".to_string(),
            "Ensure username and password are accurate".to_string(),
            "Confirm the database service is running on the target host".to_string(),
        ],
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Tool handlers bound to one connection manager.
#[derive(Debug, Default)]
pub struct SqlTools {
    manager: ConnectionManager,
}

impl SqlTools {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    pub fn manager_mut(&mut self) -> &mut ConnectionManager {
        &mut self.manager
    }

    /// Dispatch a tool call by name.
    pub async fn call(&mut self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        debug!("tool call: {}", name);
        match name {
            CONNECT_DATABASE => Ok(self.connect_database(parse_args(name, arguments)?).await),
            EXECUTE_SQL => Ok(self.execute_sql(parse_args(name, arguments)?).await),
            LIST_TABLES => Ok(self.list_tables(parse_args(name, arguments)?).await),
            DESCRIBE_TABLE => Ok(self.describe_table(parse_args(name, arguments)?).await),
            GET_CONNECTION_STATUS => Ok(self.get_connection_status()),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Connect to a database, dropping any existing connection first.
    pub async fn connect_database(&mut self, args: ConnectArgs) -> Value {
        let Some(db_type) = DatabaseType::from_tag(&args.dbtype) else {
            return json!({
                "success": false,
                "error": format!("Unsupported database type: {}", args.dbtype.trim().to_lowercase()),
                "supported_types": AdapterFactory::all_tags(),
            });
        };

        let port = if args.port == 0 {
            db_type.default_port()
        } else {
            args.port
        };
        let config = DatabaseConfig::new(
            db_type.as_tag(),
            args.host,
            port,
            args.username,
            args.password,
            args.dbname,
        );

        match self.manager.connect(config).await {
            Ok(info) => json!({
                "success": true,
                "message": format!("Successfully connected to {} database", db_type.as_tag()),
                "connection_info": info,
            }),
            Err(e) => {
                warn!("connect_database failed: {}", e);
                json!({
                    "success": false,
                    "error": e.to_string(),
                    "message": "Database connection failed",
                    "suggestions": connect_suggestions(db_type, &e),
                })
            }
        }
    }

    /// Run one SQL statement on the current connection.
    pub async fn execute_sql(&mut self, args: ExecuteArgs) -> Value {
        if !self.manager.is_connected() {
            return not_connected();
        }

        // The statement runs to completion; the timeout is informational.
        debug!("execute_sql timeout of {}s is not enforced", args.timeout);
        let result = self.manager.execute(&args.query).await;
        json!(result)
    }

    /// List tables with client-side paging.
    pub async fn list_tables(&mut self, args: ListTablesArgs) -> Value {
        if !self.manager.is_connected() {
            return not_connected();
        }

        let tables = self.manager.list_tables(args.schema.as_deref()).await;
        let total = tables.len();
        let (start, end) = paginate(total, args.offset, args.limit);
        let page = &tables[start..end];

        json!({
            "success": true,
            "tables": page,
            "table_count": page.len(),
            "total_count": total,
            "offset": start,
            "limit": args.limit,
            "message": format!("Found {} tables, showing {}-{}", total, start + 1, end),
        })
    }

    /// Describe the columns of one table.
    pub async fn describe_table(&mut self, args: DescribeArgs) -> Value {
        if !self.manager.is_connected() {
            return not_connected();
        }

        let columns = self
            .manager
            .describe_table(&args.table_name, args.schema.as_deref())
            .await;

        if columns.is_empty() {
            return json!({
                "success": false,
                "error": format!("Table '{}' not found or schema unavailable", args.table_name),
                "message": "Failed to get table schema",
                "suggestions": [
                    "Check if the table name is correct",
                    "Verify the schema",
                    "Try list_tables to see available tables",
                ],
            });
        }

        json!({
            "success": true,
            "table_name": args.table_name,
            "schema": args.schema,
            "column_count": columns.len(),
            "message": format!("Table '{}' has {} columns", args.table_name, columns.len()),
            "columns": columns,
        })
    }

    /// Report the live connection, without the password.
    pub fn get_connection_status(&self) -> Value {
        match self.manager.config() {
            Some(config) if self.manager.is_connected() => json!({
                "connected": true,
                "db_type": config.dbtype,
                "connection_info": config,
                "message": format!("Connected to {} database", config.dbtype),
            }),
            _ => json!({
                "connected": false,
                "message": "Not connected to any database",
            }),
        }
    }

    /// Close the live connection, if any.
    pub async fn shutdown(&mut self) {
        if self.manager.is_connected() {
            info!("closing database connection");
        }
        self.manager.disconnect().await;
    }
}

/// Name, description, input schema and behaviour hints for each tool.
pub fn definitions() -> Vec<Value> {
    vec![
        json!({
            "name": CONNECT_DATABASE,
            "description": "Connect to a specified database. Disconnects existing connections first. \
                Supported types: mysql, postgres, mssql, dm8, sqlite. For SQLite, 'dbname' should be \
                the absolute file path. For others, provide host, port, username, and password.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "dbtype": {"type": "string", "description": "Database type: mysql, postgres, mssql, dm8, sqlite"},
                    "host": {"type": "string", "description": "Database host address, can be ignored for SQLite", "default": "localhost"},
                    "port": {"type": "integer", "description": "Database port, automatically set based on dbtype if 0", "default": 0},
                    "username": {"type": "string", "description": "Database username, can be ignored for SQLite", "default": ""},
                    "password": {"type": "string", "description": "Database password, can be ignored for SQLite", "default": ""},
                    "dbname": {"type": "string", "description": "Database name, or file path for SQLite", "default": ""}
                },
                "required": ["dbtype"]
            },
            "annotations": {"readOnlyHint": false, "idempotentHint": false}
        }),
        json!({
            "name": EXECUTE_SQL,
            "description": "Execute a SQL statement on the current connection. Supports SELECT queries \
                and DML (INSERT/UPDATE/DELETE). Be cautious with destructive operations like \
                DROP/DELETE/TRUNCATE.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The SQL query to execute"},
                    "timeout": {"type": "integer", "description": "Query timeout in seconds", "default": DEFAULT_TIMEOUT_SECS}
                },
                "required": ["query"]
            },
            "annotations": {"readOnlyHint": false, "destructiveHint": true, "idempotentHint": false}
        }),
        json!({
            "name": LIST_TABLES,
            "description": "List all tables in the current database with types and row count \
                estimates. Supports pagination, defaults to the first 100 tables.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "schema": {"type": ["string", "null"], "description": "Schema name (optional)"},
                    "limit": {"type": "integer", "description": "Maximum number of tables to return", "default": DEFAULT_LIMIT},
                    "offset": {"type": "integer", "description": "Number of tables to skip", "default": 0}
                }
            },
            "annotations": {"readOnlyHint": true, "idempotentHint": true}
        }),
        json!({
            "name": DESCRIBE_TABLE,
            "description": "Inspect the schema of a specific table: column names, data types, \
                nullability, keys, and default values.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "table_name": {"type": "string", "description": "The name of the table"},
                    "schema": {"type": ["string", "null"], "description": "Schema name (optional)"}
                },
                "required": ["table_name"]
            },
            "annotations": {"readOnlyHint": true, "idempotentHint": true}
        }),
        json!({
            "name": GET_CONNECTION_STATUS,
            "description": "Retrieve current database connection status, database type, and \
                configuration info.",
            "inputSchema": {"type": "object", "properties": {}},
            "annotations": {"readOnlyHint": true, "idempotentHint": true}
        }),
    ]
}
