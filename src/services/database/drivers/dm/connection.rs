//! DM8 adapter implementation.
//!
//! ODBC calls are blocking, so every round trip runs on smol's blocking
//! thread pool with the connection behind a mutex.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use odbc_api::buffers::TextRowSet;
use odbc_api::{
    Connection, ConnectionOptions, Cursor, Environment, ParameterCollectionRef, ResultSetMetadata,
};
use tracing::{debug, info};

use super::discovery;
use super::types::{DmColumnKind, convert_text};
use crate::services::database::drivers::statement::{DM_ROW_KEYWORDS, is_row_producing};
use crate::services::database::error::AdapterError;
use crate::services::database::traits::{
    BoxedAdapter, ConnectParams, ConnectionInfo, DatabaseAdapter, DatabaseType, QueryResult, Row,
};

const ENGINE: &str = "DM8";
const FETCH_BATCH: usize = 1000;
const MAX_TEXT_LEN: usize = 4096;

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

fn environment() -> Result<&'static Environment, AdapterError> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new().map_err(|e| AdapterError::connection(ENGINE, e))?;
    Ok(ENVIRONMENT.get_or_init(|| env))
}

/// An ODBC connection that may move between blocking-pool threads.
pub(crate) struct DmConnection(Connection<'static>);

// SAFETY: the handle is only used while holding the adapter's mutex, so no two
// threads touch it at once, and DM connection handles are not thread-affine.
unsafe impl Send for DmConnection {}

/// A fully materialised result set.
#[derive(Debug, Default)]
pub(crate) struct Fetched {
    pub columns: Vec<String>,
    pub kinds: Vec<DmColumnKind>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Fetched {
    pub fn into_rows(self) -> (Vec<String>, Vec<Row>) {
        let rows = self
            .rows
            .into_iter()
            .map(|cells| {
                let mut row = Row::with_capacity(cells.len());
                for ((name, kind), cell) in self.columns.iter().zip(&self.kinds).zip(cells) {
                    row.insert(name.as_str(), convert_text(*kind, cell.as_deref()));
                }
                row
            })
            .collect();
        (self.columns, rows)
    }

    /// First cell of the first row, as text.
    pub fn scalar(&self) -> Option<String> {
        self.rows.first()?.first()?.clone()
    }
}

/// Run a statement and buffer every row it returns as text.
pub(crate) fn fetch(
    conn: &Connection<'_>,
    sql: &str,
    params: impl ParameterCollectionRef,
) -> Result<Fetched, odbc_api::Error> {
    let Some(mut cursor) = conn.execute(sql, params)? else {
        return Ok(Fetched::default());
    };

    let num_cols = cursor.num_result_cols()?.max(0) as u16;
    let mut fetched = Fetched::default();
    for col in 1..=num_cols {
        fetched.columns.push(cursor.col_name(col)?);
        fetched
            .kinds
            .push(DmColumnKind::from_data_type(cursor.col_data_type(col)?));
    }

    let mut buffers = TextRowSet::for_cursor(FETCH_BATCH, &mut cursor, Some(MAX_TEXT_LEN))?;
    let mut row_cursor = cursor.bind_buffer(&mut buffers)?;
    // Values longer than MAX_TEXT_LEN fail the statement rather than being cut.
    while let Some(batch) = row_cursor.fetch_with_truncation_check(true)? {
        for row_idx in 0..batch.num_rows() {
            let cells = (0..num_cols as usize)
                .map(|col_idx| {
                    batch
                        .at(col_idx, row_idx)
                        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                })
                .collect();
            fetched.rows.push(cells);
        }
    }

    Ok(fetched)
}

fn execute_effect(conn: &Connection<'_>, sql: &str) -> Result<u64, odbc_api::Error> {
    let mut statement = conn.preallocate()?;
    statement.execute(sql, ())?;
    Ok(statement.row_count()?.unwrap_or(0) as u64)
}

/// Brace-quote an ODBC connection string value.
fn odbc_value(value: &str) -> String {
    format!("{{{}}}", value.replace('}', "}}"))
}

/// Build the ODBC connection string. `dbname` selects the default schema.
pub fn connection_string(driver: &Path, params: &ConnectParams) -> String {
    let mut s = format!(
        "Driver={};Server={};TCP_Port={};UID={};PWD={};",
        odbc_value(&driver.to_string_lossy()),
        odbc_value(&params.host),
        params.port,
        odbc_value(&params.username),
        odbc_value(&params.password),
    );
    if !params.dbname.is_empty() {
        s.push_str(&format!("SCHEMA={};", odbc_value(&params.dbname)));
    }
    s
}

/// DM8 database adapter.
pub struct DmAdapter {
    driver_path: PathBuf,
    conn: Option<Arc<Mutex<DmConnection>>>,
}

impl std::fmt::Debug for DmAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmAdapter")
            .field("driver_path", &self.driver_path)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl DmAdapter {
    /// Locate the DM ODBC driver and create a disconnected adapter.
    pub fn new() -> Result<Self, AdapterError> {
        let driver_path = discovery::discover().ok_or_else(|| {
            AdapterError::NotFound(format!(
                "DM8 ODBC driver ({}) not found. Set {} to the driver path or {} to the DM installation directory",
                discovery::LIBRARY_NAME,
                discovery::DRIVER_ENV,
                discovery::HOME_ENV
            ))
        })?;
        debug!("using DM8 ODBC driver at {}", driver_path.display());
        Ok(Self::with_driver(driver_path))
    }

    /// Create an adapter for a known driver library.
    pub fn with_driver(driver_path: impl Into<PathBuf>) -> Self {
        Self {
            driver_path: driver_path.into(),
            conn: None,
        }
    }

    /// Create a boxed adapter (for factory use).
    pub fn boxed() -> Result<BoxedAdapter, AdapterError> {
        Ok(Box::new(Self::new()?))
    }

    pub fn driver_path(&self) -> &Path {
        &self.driver_path
    }

    /// Run a blocking ODBC operation against the live connection.
    pub(crate) async fn with_connection<T, F>(&self, op: F) -> Result<T, AdapterError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection<'static>) -> Result<T, odbc_api::Error> + Send + 'static,
    {
        let conn = self.conn.clone().ok_or(AdapterError::NotConnected)?;
        smol::unblock(move || {
            let guard = conn
                .lock()
                .map_err(|_| AdapterError::Execution("DM8 connection lock poisoned".to_string()))?;
            op(&guard.0).map_err(AdapterError::execution)
        })
        .await
    }
}

#[async_trait]
impl DatabaseAdapter for DmAdapter {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::Dm8
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self, params: &ConnectParams) -> Result<ConnectionInfo, AdapterError> {
        self.disconnect().await;

        let conn_str = connection_string(&self.driver_path, params);
        let (conn, version, user) = smol::unblock(move || {
            let env = environment()?;
            let conn = env
                .connect_with_connection_string(&conn_str, ConnectionOptions::default())
                .map_err(|e| AdapterError::connection(ENGINE, e))?;

            let version = fetch(&conn, "SELECT BANNER FROM V$VERSION WHERE ROWNUM = 1", ())
                .map_err(|e| AdapterError::connection(ENGINE, e))?
                .scalar();
            let user = fetch(&conn, "SELECT USER FROM DUAL", ())
                .map_err(|e| AdapterError::connection(ENGINE, e))?
                .scalar();

            Ok::<_, AdapterError>((DmConnection(conn), version, user))
        })
        .await?;

        let mut info = ConnectionInfo::new(version.unwrap_or_else(|| "Unknown".to_string()))
            .with_endpoint(&params.host, params.port)
            .with_extra("driver", "odbc")
            .with_extra("driver_path", self.driver_path.to_string_lossy().into_owned());
        info.current_user = user;
        if !params.dbname.is_empty() {
            info.current_database = Some(params.dbname.clone());
        }

        info!("connected to DM8 at {}:{}", params.host, params.port);
        self.conn = Some(Arc::new(Mutex::new(conn)));
        Ok(info)
    }

    async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            // Dropping the handle disconnects, which is a blocking call.
            smol::unblock(move || drop(conn)).await;
            info!("disconnected from DM8");
        }
    }

    async fn execute_query(&mut self, sql: &str) -> QueryResult {
        if self.conn.is_none() {
            return QueryResult::not_connected();
        }

        let sql = sql.trim().to_string();
        if sql.is_empty() {
            return QueryResult::empty_query();
        }

        if is_row_producing(&sql, DM_ROW_KEYWORDS) {
            match self.with_connection(move |conn| fetch(conn, &sql, ())).await {
                Ok(fetched) if fetched.columns.is_empty() => QueryResult::affected(0),
                Ok(fetched) => {
                    let (columns, rows) = fetched.into_rows();
                    QueryResult::rows(columns, rows)
                }
                Err(e) => QueryResult::query_failed(e),
            }
        } else {
            match self
                .with_connection(move |conn| execute_effect(conn, &sql))
                .await
            {
                Ok(affected) => QueryResult::affected(affected),
                Err(e) => QueryResult::query_failed(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string_escapes_values() {
        let params = ConnectParams::new("10.0.0.5", 5236, "SYSDBA", "pa}ss;word", "APP");
        let s = connection_string(Path::new("/opt/dmdbms/bin/libdodbc.so"), &params);
        assert_eq!(
            s,
            "Driver={/opt/dmdbms/bin/libdodbc.so};Server={10.0.0.5};TCP_Port=5236;\
             UID={SYSDBA};PWD={pa}}ss;word};SCHEMA={APP};"
        );
    }

    #[test]
    fn test_connection_string_without_schema() {
        let params = ConnectParams::new("localhost", 5236, "SYSDBA", "pw", "");
        let s = connection_string(Path::new("libdodbc.so"), &params);
        assert!(!s.contains("SCHEMA="));
    }

    #[test]
    fn test_fetched_into_rows() {
        let fetched = Fetched {
            columns: vec!["ID".to_string(), "NAME".to_string()],
            kinds: vec![DmColumnKind::Integer, DmColumnKind::Text],
            rows: vec![
                vec![Some("1".to_string()), Some("alice".to_string())],
                vec![Some("2".to_string()), None],
            ],
        };
        assert_eq!(fetched.scalar(), Some("1".to_string()));

        let (columns, rows) = fetched.into_rows();
        assert_eq!(columns, vec!["ID", "NAME"]);
        assert_eq!(rows[0].get("ID"), Some(&crate::services::database::traits::Value::Int(1)));
        assert_eq!(
            rows[1].get("NAME"),
            Some(&crate::services::database::traits::Value::Null)
        );
    }

    #[test]
    fn test_disconnected_adapter() {
        smol::block_on(async {
            let mut adapter = DmAdapter::with_driver("/nonexistent/libdodbc.so");
            assert_eq!(adapter.db_type(), DatabaseType::Dm8);
            assert!(!adapter.is_connected());
            assert!(!adapter.execute_query("SELECT 1 FROM DUAL").await.success);
            adapter.disconnect().await;
        });
    }
}
