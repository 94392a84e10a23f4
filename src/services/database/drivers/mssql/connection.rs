//! SQL Server adapter implementation.
//!
//! Tiberius speaks TDS over any `futures` byte stream, so the client runs
//! directly on a smol `TcpStream`.

use async_trait::async_trait;
use smol::net::TcpStream;
use tiberius::{AuthMethod, Client, Config};
use tracing::{debug, info};

use super::types::MssqlValueConverter;
use crate::services::database::drivers::statement::{MSSQL_ROW_KEYWORDS, is_row_producing};
use crate::services::database::error::AdapterError;
use crate::services::database::traits::{
    BoxedAdapter, ConnectParams, ConnectionInfo, DatabaseAdapter, DatabaseType, QueryResult, Row,
};

const ENGINE: &str = "SQL Server";

pub(crate) type MssqlClient = Client<TcpStream>;

/// SQL Server database adapter.
#[derive(Default)]
pub struct MssqlAdapter {
    client: Option<MssqlClient>,
}

impl std::fmt::Debug for MssqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlAdapter")
            .field("connected", &self.client.is_some())
            .finish()
    }
}

impl MssqlAdapter {
    /// Create a new, disconnected SQL Server adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a boxed adapter (for factory use).
    pub fn boxed() -> BoxedAdapter {
        Box::new(Self::new())
    }

    /// Build a Tiberius config from the connect parameters.
    ///
    /// The server certificate is trusted as presented, the way most
    /// development instances are set up.
    fn build_config(params: &ConnectParams) -> Config {
        let mut config = Config::new();
        config.host(&params.host);
        config.port(params.port);
        config.authentication(AuthMethod::sql_server(&params.username, &params.password));
        config.application_name("sqltools-mcp");
        config.trust_cert();

        if !params.dbname.is_empty() {
            config.database(&params.dbname);
        }

        config
    }

    pub(crate) fn client_mut(&mut self) -> Option<&mut MssqlClient> {
        self.client.as_mut()
    }

    async fn open(params: &ConnectParams) -> Result<MssqlClient, AdapterError> {
        let config = Self::build_config(params);
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| AdapterError::connection(ENGINE, e))?;
        tcp.set_nodelay(true)
            .map_err(|e| AdapterError::connection(ENGINE, e))?;

        Client::connect(config, tcp)
            .await
            .map_err(|e| AdapterError::connection(ENGINE, e))
    }

    async fn verify(client: &mut MssqlClient) -> Result<(String, Option<String>, Option<String>), tiberius::error::Error> {
        let row = client
            .simple_query("SELECT @@VERSION, DB_NAME(), SYSTEM_USER")
            .await?
            .into_row()
            .await?;

        let Some(row) = row else {
            return Ok((String::new(), None, None));
        };

        let text = |idx: usize| -> Option<String> {
            row.try_get::<&str, _>(idx).ok().flatten().map(str::to_string)
        };
        Ok((text(0).unwrap_or_default(), text(1), text(2)))
    }

    async fn execute_rows(client: &mut MssqlClient, sql: &str) -> QueryResult {
        let mut stream = match client.simple_query(sql).await {
            Ok(stream) => stream,
            Err(e) => return QueryResult::query_failed(e),
        };

        let columns = match stream.columns().await {
            Ok(Some(cols)) => MssqlValueConverter::column_names(cols),
            Ok(None) => Vec::new(),
            Err(e) => return QueryResult::query_failed(e),
        };

        let rows = match stream.into_first_result().await {
            Ok(rows) => rows,
            Err(e) => return QueryResult::query_failed(e),
        };

        // A procedure that only changes data yields no result set.
        if columns.is_empty() {
            return QueryResult::affected(0);
        }

        let rows: Vec<Row> = rows.iter().map(MssqlValueConverter::convert_row).collect();
        QueryResult::rows(columns, rows)
    }

    async fn execute_effect(client: &mut MssqlClient, sql: &str) -> QueryResult {
        match client.execute(sql, &[]).await {
            Ok(result) => QueryResult::affected(result.total()),
            Err(e) => QueryResult::query_failed(e),
        }
    }
}

#[async_trait]
impl DatabaseAdapter for MssqlAdapter {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::Mssql
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn connect(&mut self, params: &ConnectParams) -> Result<ConnectionInfo, AdapterError> {
        self.disconnect().await;

        let mut client = Self::open(params).await?;
        let (version, database, user) = match Self::verify(&mut client).await {
            Ok(details) => details,
            Err(e) => {
                let _ = client.close().await;
                return Err(AdapterError::connection(ENGINE, e));
            }
        };

        let mut info = ConnectionInfo::new(version).with_endpoint(&params.host, params.port);
        info.current_database = database;
        info.current_user = user;

        info!(
            "connected to SQL Server at {}:{}/{}",
            params.host,
            params.port,
            info.current_database.as_deref().unwrap_or("")
        );
        self.client = Some(client);
        Ok(info)
    }

    async fn disconnect(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.close().await {
                debug!("error closing SQL Server connection: {}", e);
            }
            info!("disconnected from SQL Server");
        }
    }

    async fn execute_query(&mut self, sql: &str) -> QueryResult {
        let Some(client) = self.client.as_mut() else {
            return QueryResult::not_connected();
        };

        let sql = sql.trim();
        if sql.is_empty() {
            return QueryResult::empty_query();
        }

        if is_row_producing(sql, MSSQL_ROW_KEYWORDS) {
            Self::execute_rows(client, sql).await
        } else {
            Self::execute_effect(client, sql).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mssql_adapter_new() {
        let adapter = MssqlAdapter::new();
        assert_eq!(adapter.db_type(), DatabaseType::Mssql);
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_build_config_address() {
        let params = ConnectParams::new("db.internal", 1433, "sa", "secret", "master");
        let config = MssqlAdapter::build_config(&params);
        assert_eq!(config.get_addr(), "db.internal:1433");
    }

    #[test]
    fn test_not_connected_paths() {
        smol::block_on(async {
            let mut adapter = MssqlAdapter::new();
            let result = adapter.execute_query("SELECT 1").await;
            assert!(!result.success);
            adapter.disconnect().await;
            assert!(!adapter.is_connected());
        });
    }

    #[test]
    fn test_connect_refused() {
        smol::block_on(async {
            let mut adapter = MssqlAdapter::new();
            let params = ConnectParams::new("127.0.0.1", 1, "sa", "secret", "master");
            let err = adapter.connect(&params).await.unwrap_err();
            assert!(matches!(err, AdapterError::Connection { engine: "SQL Server", .. }));
            assert!(!adapter.is_connected());
        });
    }
}
