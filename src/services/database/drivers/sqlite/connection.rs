//! SQLite adapter implementation.
//!
//! This module implements the `DatabaseAdapter` trait for SQLite using a
//! single SQLx `SqliteConnection`.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, Executor, Statement};
use tracing::{debug, info};

use super::types::SqliteValueConverter;
use crate::services::database::drivers::statement::{SQLITE_ROW_KEYWORDS, is_row_producing};
use crate::services::database::error::AdapterError;
use crate::services::database::traits::{
    BoxedAdapter, ConnectParams, ConnectionInfo, DatabaseAdapter, DatabaseType, QueryResult, Row,
};

const ENGINE: &str = "SQLite";

/// Sentinel path for a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// SQLite database adapter.
///
/// `dbname` is a file path that must already exist, or `:memory:`.
#[derive(Default)]
pub struct SqliteAdapter {
    conn: Option<sqlx::SqliteConnection>,
    db_path: Option<String>,
}

impl std::fmt::Debug for SqliteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAdapter")
            .field("db_path", &self.db_path)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl SqliteAdapter {
    /// Create a new, disconnected SQLite adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a boxed adapter (for factory use).
    pub fn boxed() -> BoxedAdapter {
        Box::new(Self::new())
    }

    /// Resolve `dbname` to the path we open, checking that it exists.
    fn resolve_path(dbname: &str) -> Result<String, AdapterError> {
        let dbname = dbname.trim();
        if dbname.is_empty() {
            return Err(AdapterError::InvalidArgument(
                "SQLite requires a database file path in 'dbname'".to_string(),
            ));
        }
        if dbname == MEMORY_PATH {
            return Ok(MEMORY_PATH.to_string());
        }

        let path = Path::new(dbname);
        if !path.exists() {
            return Err(AdapterError::NotFound(format!(
                "Database file not found: {}",
                dbname
            )));
        }

        Ok(std::fs::canonicalize(path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| dbname.to_string()))
    }

    /// Build SqliteConnectOptions for a resolved path.
    fn build_connect_options(path: &str) -> Result<SqliteConnectOptions, AdapterError> {
        if path == MEMORY_PATH {
            return SqliteConnectOptions::from_str(MEMORY_PATH)
                .map_err(|e| AdapterError::connection(ENGINE, e));
        }

        Ok(SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false)
            .foreign_keys(true))
    }

    /// Run the verification queries on a fresh connection.
    async fn verify(
        conn: &mut sqlx::SqliteConnection,
        path: &str,
    ) -> Result<ConnectionInfo, sqlx::Error> {
        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&mut *conn)
            .await?;
        let table_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'")
                .fetch_one(&mut *conn)
                .await?;

        let file_size = if path == MEMORY_PATH {
            serde_json::Value::Null
        } else {
            std::fs::metadata(path)
                .map(|m| serde_json::Value::from(m.len()))
                .unwrap_or(serde_json::Value::Null)
        };

        let mut info = ConnectionInfo::new(version)
            .with_extra("database_path", path)
            .with_extra("file_size_bytes", file_size)
            .with_extra("table_count", table_count);
        info.current_database = Some(path.to_string());
        Ok(info)
    }

    /// Get the live connection (internal helper for the schema module).
    pub(crate) fn conn_mut(&mut self) -> Option<&mut sqlx::SqliteConnection> {
        self.conn.as_mut()
    }

    async fn execute_rows(conn: &mut sqlx::SqliteConnection, sql: &str) -> QueryResult {
        let stmt = match (&mut *conn).prepare(sql).await {
            Ok(stmt) => stmt,
            Err(e) => return QueryResult::query_failed(e),
        };

        let columns = SqliteValueConverter::column_names(stmt.columns());
        if columns.is_empty() {
            debug!("statement has no result columns, reporting affected rows");
            return Self::execute_effect(conn, sql).await;
        }

        match stmt.query().fetch_all(&mut *conn).await {
            Ok(sqlite_rows) => {
                let rows: Vec<Row> = sqlite_rows
                    .iter()
                    .map(SqliteValueConverter::convert_row)
                    .collect();
                QueryResult::rows(columns, rows)
            }
            Err(e) => QueryResult::query_failed(e),
        }
    }

    async fn execute_effect(conn: &mut sqlx::SqliteConnection, sql: &str) -> QueryResult {
        match sqlx::query(sql).execute(&mut *conn).await {
            Ok(result) => QueryResult::affected(result.rows_affected()),
            Err(e) => QueryResult::query_failed(e),
        }
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self, params: &ConnectParams) -> Result<ConnectionInfo, AdapterError> {
        self.disconnect().await;

        let path = Self::resolve_path(&params.dbname)?;
        let options = Self::build_connect_options(&path)?;

        let mut conn = sqlx::SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| AdapterError::connection(ENGINE, e))?;

        let info = match Self::verify(&mut conn, &path).await {
            Ok(info) => info,
            Err(e) => {
                let _ = conn.close().await;
                return Err(AdapterError::connection(ENGINE, e));
            }
        };

        info!(path = %path, version = %info.server_version, "connected to SQLite");
        self.conn = Some(conn);
        self.db_path = Some(path);
        Ok(info)
    }

    async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!("error closing SQLite connection: {}", e);
            }
            info!("disconnected from SQLite");
        }
        self.db_path = None;
    }

    async fn execute_query(&mut self, sql: &str) -> QueryResult {
        let Some(conn) = self.conn.as_mut() else {
            return QueryResult::not_connected();
        };

        let sql = sql.trim();
        if sql.is_empty() {
            return QueryResult::empty_query();
        }

        if is_row_producing(sql, SQLITE_ROW_KEYWORDS) {
            Self::execute_rows(conn, sql).await
        } else {
            Self::execute_effect(conn, sql).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::traits::Value;

    fn memory() -> ConnectParams {
        ConnectParams::file(MEMORY_PATH)
    }

    #[test]
    fn test_new_adapter_is_disconnected() {
        let adapter = SqliteAdapter::new();
        assert_eq!(adapter.db_type(), DatabaseType::Sqlite);
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_execute_without_connection() {
        smol::block_on(async {
            let mut adapter = SqliteAdapter::new();
            let result = adapter.execute_query("SELECT 1").await;
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some("Not connected to database"));
        });
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        smol::block_on(async {
            let mut adapter = SqliteAdapter::new();
            adapter.disconnect().await;
            adapter.disconnect().await;
            assert!(!adapter.is_connected());

            adapter.connect(&memory()).await.unwrap();
            adapter.disconnect().await;
            adapter.disconnect().await;
            assert!(!adapter.is_connected());
        });
    }

    #[test]
    fn test_missing_file_is_not_found() {
        smol::block_on(async {
            let mut adapter = SqliteAdapter::new();
            let err = adapter
                .connect(&ConnectParams::file("/definitely/not/here.db"))
                .await
                .unwrap_err();
            assert!(matches!(err, AdapterError::NotFound(_)));
            assert!(!adapter.is_connected());
        });
    }

    #[test]
    fn test_connect_reports_file_details() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        std::fs::File::create(&path).unwrap();

        smol::block_on(async {
            let mut adapter = SqliteAdapter::new();
            let info = adapter
                .connect(&ConnectParams::file(path.display().to_string()))
                .await
                .unwrap();

            assert!(adapter.is_connected());
            assert!(!info.server_version.is_empty());
            assert_eq!(info.extra["table_count"], 0);
            assert!(info.extra["database_path"].as_str().unwrap().ends_with("app.db"));
            adapter.disconnect().await;
        });
    }

    #[test]
    fn test_select_returns_columns_and_rows() {
        smol::block_on(async {
            let mut adapter = SqliteAdapter::new();
            adapter.connect(&memory()).await.unwrap();

            let result = adapter.execute_query("SELECT 1").await;
            assert!(result.success);
            assert_eq!(result.columns, Some(vec!["1".to_string()]));
            assert_eq!(result.row_count, 1);
            assert!(result.affected_rows.is_none());
            let rows = result.rows.unwrap();
            assert_eq!(rows[0].get("1"), Some(&Value::Int(1)));
        });
    }

    #[test]
    fn test_empty_select_still_reports_columns() {
        smol::block_on(async {
            let mut adapter = SqliteAdapter::new();
            adapter.connect(&memory()).await.unwrap();
            adapter
                .execute_query("CREATE TABLE t (id INTEGER, name TEXT)")
                .await;

            let result = adapter.execute_query("SELECT id, name FROM t").await;
            assert!(result.success);
            assert_eq!(
                result.columns,
                Some(vec!["id".to_string(), "name".to_string()])
            );
            assert_eq!(result.row_count, 0);
        });
    }

    #[test]
    fn test_modification_reports_affected_rows() {
        smol::block_on(async {
            let mut adapter = SqliteAdapter::new();
            adapter.connect(&memory()).await.unwrap();

            let created = adapter.execute_query("CREATE TABLE t (id INTEGER)").await;
            assert!(created.success);

            let inserted = adapter
                .execute_query("INSERT INTO t VALUES (1), (2), (3)")
                .await;
            assert_eq!(inserted.affected_rows, Some(3));

            let deleted = adapter.execute_query("DELETE FROM t WHERE id > 1").await;
            assert!(deleted.success);
            assert_eq!(deleted.affected_rows, Some(2));
            assert!(deleted.columns.is_none());
            assert!(deleted.rows.is_none());
        });
    }

    #[test]
    fn test_failed_statement_is_reported() {
        smol::block_on(async {
            let mut adapter = SqliteAdapter::new();
            adapter.connect(&memory()).await.unwrap();

            let result = adapter.execute_query("SELECT * FROM missing").await;
            assert!(!result.success);
            assert!(result.error.unwrap().contains("missing"));

            let empty = adapter.execute_query("   ").await;
            assert!(!empty.success);
        });
    }

    #[test]
    fn test_reconnect_replaces_handle() {
        smol::block_on(async {
            let mut adapter = SqliteAdapter::new();
            adapter.connect(&memory()).await.unwrap();
            adapter.execute_query("CREATE TABLE t (id INTEGER)").await;

            adapter.connect(&memory()).await.unwrap();
            let result = adapter.execute_query("SELECT * FROM t").await;
            assert!(!result.success);
        });
    }
}
