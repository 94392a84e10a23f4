//! MySQL adapter implementation.
//!
//! This module implements the `DatabaseAdapter` trait for MySQL/MariaDB
//! using a single SQLx `MySqlConnection`.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use sqlx::{Connection, Executor, Row as _, Statement};
use tracing::{debug, info};

use super::types::MySqlValueConverter;
use crate::services::database::drivers::statement::{MYSQL_ROW_KEYWORDS, is_row_producing};
use crate::services::database::error::AdapterError;
use crate::services::database::traits::{
    BoxedAdapter, ConnectParams, ConnectionInfo, DatabaseAdapter, DatabaseType, QueryResult, Row,
};

const ENGINE: &str = "MySQL";

/// MySQL database adapter.
#[derive(Default)]
pub struct MySqlAdapter {
    conn: Option<sqlx::MySqlConnection>,
}

impl std::fmt::Debug for MySqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlAdapter")
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl MySqlAdapter {
    /// Create a new, disconnected MySQL adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a boxed adapter (for factory use).
    pub fn boxed() -> BoxedAdapter {
        Box::new(Self::new())
    }

    /// Build MySqlConnectOptions from the connect parameters.
    fn build_connect_options(params: &ConnectParams) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .username(&params.username)
            .password(&params.password)
            .ssl_mode(MySqlSslMode::Preferred)
            .charset("utf8mb4");

        if !params.dbname.is_empty() {
            options = options.database(&params.dbname);
        }

        options
    }

    /// Get the live connection (internal helper for the schema module).
    pub(crate) fn conn_mut(&mut self) -> Option<&mut sqlx::MySqlConnection> {
        self.conn.as_mut()
    }

    /// Run a row-producing statement.
    ///
    /// Statements the server refuses to prepare (some SHOW variants) run
    /// over the text protocol instead, taking column names from the rows.
    async fn execute_rows(conn: &mut sqlx::MySqlConnection, sql: &str) -> QueryResult {
        match (&mut *conn).prepare(sql).await {
            Ok(stmt) => {
                let columns = MySqlValueConverter::column_names(stmt.columns());
                if columns.is_empty() {
                    return Self::execute_effect(conn, sql).await;
                }
                match stmt.query().fetch_all(&mut *conn).await {
                    Ok(rows) => QueryResult::rows(
                        columns,
                        rows.iter().map(MySqlValueConverter::convert_row).collect(),
                    ),
                    Err(e) => QueryResult::query_failed(e),
                }
            }
            Err(e) => {
                debug!("prepare failed ({}), retrying over the text protocol", e);
                match (&mut *conn).fetch_all(sql).await {
                    Ok(mysql_rows) => {
                        let rows: Vec<Row> = mysql_rows
                            .iter()
                            .map(MySqlValueConverter::convert_row)
                            .collect();
                        QueryResult::rows(text_protocol_columns(&mysql_rows), rows)
                    }
                    Err(e) => QueryResult::query_failed(e),
                }
            }
        }
    }

    /// Run an effectful statement over the text protocol so DDL and
    /// procedure definitions are accepted.
    async fn execute_effect(conn: &mut sqlx::MySqlConnection, sql: &str) -> QueryResult {
        match (&mut *conn).execute(sql).await {
            Ok(result) => QueryResult::affected(result.rows_affected()),
            Err(e) => QueryResult::query_failed(e),
        }
    }
}

#[async_trait]
impl DatabaseAdapter for MySqlAdapter {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self, params: &ConnectParams) -> Result<ConnectionInfo, AdapterError> {
        self.disconnect().await;

        let options = Self::build_connect_options(params);
        let mut conn = sqlx::MySqlConnection::connect_with(&options)
            .await
            .map_err(|e| AdapterError::connection(ENGINE, e))?;

        let verified = sqlx::query("SELECT VERSION(), DATABASE(), USER()")
            .fetch_one(&mut conn)
            .await;
        let row = match verified {
            Ok(row) => row,
            Err(e) => {
                let _ = conn.close().await;
                return Err(AdapterError::connection(ENGINE, e));
            }
        };

        let mut info = ConnectionInfo::new(MySqlValueConverter::text(&row, 0).unwrap_or_default())
            .with_endpoint(&params.host, params.port);
        info.current_database = MySqlValueConverter::text(&row, 1);
        info.current_user = MySqlValueConverter::text(&row, 2);

        info!(
            "connected to MySQL {} at {}:{}",
            info.server_version, params.host, params.port
        );
        self.conn = Some(conn);
        Ok(info)
    }

    async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!("error closing MySQL connection: {}", e);
            }
            info!("disconnected from MySQL");
        }
    }

    async fn execute_query(&mut self, sql: &str) -> QueryResult {
        let Some(conn) = self.conn.as_mut() else {
            return QueryResult::not_connected();
        };

        let sql = sql.trim();
        if sql.is_empty() {
            return QueryResult::empty_query();
        }

        if is_row_producing(sql, MYSQL_ROW_KEYWORDS) {
            Self::execute_rows(conn, sql).await
        } else {
            Self::execute_effect(conn, sql).await
        }
    }
}

/// Column names for a result read over the text protocol.
///
/// Only rows carry column metadata there, so an empty result set reports no
/// columns.
fn text_protocol_columns(rows: &[sqlx::mysql::MySqlRow]) -> Vec<String> {
    rows.first()
        .map(|r| MySqlValueConverter::column_names(r.columns()))
        .unwrap_or_default()
}
