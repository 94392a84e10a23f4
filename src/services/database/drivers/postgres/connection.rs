//! PostgreSQL adapter implementation.
//!
//! This module implements the `DatabaseAdapter` trait for PostgreSQL using a
//! single SQLx `PgConnection`.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{Connection, Executor, Row as _, Statement};
use tracing::{debug, info};

use super::types::PgValueConverter;
use crate::services::database::drivers::statement::{POSTGRES_ROW_KEYWORDS, is_row_producing};
use crate::services::database::error::AdapterError;
use crate::services::database::traits::{
    BoxedAdapter, ConnectParams, ConnectionInfo, DatabaseAdapter, DatabaseType, QueryResult, Row,
};

const ENGINE: &str = "PostgreSQL";

/// PostgreSQL database adapter.
#[derive(Default)]
pub struct PostgresAdapter {
    conn: Option<sqlx::PgConnection>,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl PostgresAdapter {
    /// Create a new, disconnected PostgreSQL adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a boxed adapter (for factory use).
    pub fn boxed() -> BoxedAdapter {
        Box::new(Self::new())
    }

    /// Build PgConnectOptions from the connect parameters.
    ///
    /// `sslmode` may be passed through `params.options`; it defaults to
    /// `prefer`.
    fn build_connect_options(params: &ConnectParams) -> Result<PgConnectOptions, AdapterError> {
        let ssl_mode = match params.options.get("sslmode") {
            Some(mode) => mode.parse::<PgSslMode>().map_err(|_| {
                AdapterError::InvalidArgument(format!("Invalid PostgreSQL sslmode: {}", mode))
            })?,
            None => PgSslMode::Prefer,
        };

        let mut options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .username(&params.username)
            .password(&params.password)
            .ssl_mode(ssl_mode)
            .application_name("sqltools-mcp");

        if !params.dbname.is_empty() {
            options = options.database(&params.dbname);
        }

        Ok(options)
    }

    /// Get the live connection (internal helper for the schema module).
    pub(crate) fn conn_mut(&mut self) -> Option<&mut sqlx::PgConnection> {
        self.conn.as_mut()
    }

    async fn execute_rows(conn: &mut sqlx::PgConnection, sql: &str) -> QueryResult {
        let stmt = match (&mut *conn).prepare(sql).await {
            Ok(stmt) => stmt,
            Err(e) => return QueryResult::query_failed(e),
        };

        let columns = PgValueConverter::column_names(stmt.columns());
        if columns.is_empty() {
            return Self::execute_effect(conn, sql).await;
        }

        match stmt.query().fetch_all(&mut *conn).await {
            Ok(pg_rows) => {
                let rows: Vec<Row> = pg_rows.iter().map(PgValueConverter::convert_row).collect();
                QueryResult::rows(columns, rows)
            }
            Err(e) => QueryResult::query_failed(e),
        }
    }

    /// Effectful statements go through the simple query protocol, which also
    /// accepts several statements separated by semicolons.
    async fn execute_effect(conn: &mut sqlx::PgConnection, sql: &str) -> QueryResult {
        match (&mut *conn).execute(sql).await {
            Ok(result) => QueryResult::affected(result.rows_affected()),
            Err(e) => QueryResult::query_failed(e),
        }
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self, params: &ConnectParams) -> Result<ConnectionInfo, AdapterError> {
        self.disconnect().await;

        let options = Self::build_connect_options(params)?;
        let mut conn = sqlx::PgConnection::connect_with(&options)
            .await
            .map_err(|e| AdapterError::connection(ENGINE, e))?;

        let verified =
            sqlx::query("SELECT version(), current_database()::text, current_user::text")
                .fetch_one(&mut conn)
                .await;
        let row = match verified {
            Ok(row) => row,
            Err(e) => {
                let _ = conn.close().await;
                return Err(AdapterError::connection(ENGINE, e));
            }
        };

        let mut info = ConnectionInfo::new(row.try_get::<String, _>(0).unwrap_or_default())
            .with_endpoint(&params.host, params.port);
        info.current_database = row.try_get::<Option<String>, _>(1).ok().flatten();
        info.current_user = row.try_get::<Option<String>, _>(2).ok().flatten();

        info!(
            "connected to PostgreSQL at {}:{}/{}",
            params.host,
            params.port,
            info.current_database.as_deref().unwrap_or("")
        );
        self.conn = Some(conn);
        Ok(info)
    }

    async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!("error closing PostgreSQL connection: {}", e);
            }
            info!("disconnected from PostgreSQL");
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

        if is_row_producing(sql, POSTGRES_ROW_KEYWORDS) {
            Self::execute_rows(conn, sql).await
        } else {
            Self::execute_effect(conn, sql).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_adapter_new() {
        let adapter = PostgresAdapter::new();
        assert_eq!(adapter.db_type(), DatabaseType::Postgres);
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_build_connect_options_rejects_bad_sslmode() {
        let mut params = ConnectParams::new("localhost", 5432, "postgres", "pw", "app");
        params
            .options
            .insert("sslmode".to_string(), "sometimes".to_string());
        assert!(matches!(
            PostgresAdapter::build_connect_options(&params),
            Err(AdapterError::InvalidArgument(_))
        ));

        params
            .options
            .insert("sslmode".to_string(), "require".to_string());
        assert!(PostgresAdapter::build_connect_options(&params).is_ok());
    }

    #[test]
    fn test_not_connected_paths() {
        smol::block_on(async {
            let mut adapter = PostgresAdapter::new();
            assert!(!adapter.execute_query("SELECT 1").await.success);
            adapter.disconnect().await;
            assert!(!adapter.is_connected());
        });
    }
}
