//! Connection manager.
//!
//! Owns the single active adapter together with the settings it was opened
//! with. Every method takes `&mut self`; callers serialize access.

use tracing::{debug, info};

use super::drivers::AdapterFactory;
use super::error::AdapterError;
use super::traits::{
    BoxedAdapter, ColumnInfo, ConnectionInfo, DatabaseAdapter, DatabaseType, QueryResult,
    SchemaIntrospection, TableInfo,
};
use crate::config::DatabaseConfig;

/// Holds zero or one live adapter.
#[derive(Default)]
pub struct ConnectionManager {
    adapter: Option<BoxedAdapter>,
    config: Option<DatabaseConfig>,
    connection_info: Option<ConnectionInfo>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("db_type", &self.current_db_type())
            .field("config", &self.config)
            .finish()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect with the given settings, replacing any existing connection.
    ///
    /// The previous adapter is fully torn down before the new one is created.
    /// On failure the manager holds nothing.
    pub async fn connect(&mut self, config: DatabaseConfig) -> Result<ConnectionInfo, AdapterError> {
        self.disconnect().await;
        let adapter = AdapterFactory::create(&config.dbtype)?;
        self.connect_adapter(adapter, config).await
    }

    /// Connect through an adapter built by the caller.
    pub async fn connect_adapter(
        &mut self,
        mut adapter: BoxedAdapter,
        config: DatabaseConfig,
    ) -> Result<ConnectionInfo, AdapterError> {
        self.disconnect().await;

        let params = config.to_connect_params();
        match adapter.connect(&params).await {
            Ok(info) => {
                info!("connection manager now holds a {} connection", adapter.db_type());
                self.adapter = Some(adapter);
                self.config = Some(config);
                self.connection_info = Some(info.clone());
                Ok(info)
            }
            Err(e) => {
                adapter.disconnect().await;
                Err(e)
            }
        }
    }

    /// Disconnect and forget the current adapter. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            debug!("tearing down {} connection", adapter.db_type());
            adapter.disconnect().await;
        }
        self.config = None;
        self.connection_info = None;
    }

    pub async fn execute(&mut self, sql: &str) -> QueryResult {
        match self.adapter.as_mut() {
            Some(adapter) => adapter.execute_query(sql).await,
            None => QueryResult::no_connection(),
        }
    }

    pub async fn list_tables(&mut self, schema: Option<&str>) -> Vec<TableInfo> {
        match self.adapter.as_mut() {
            Some(adapter) => adapter.list_tables(schema).await,
            None => Vec::new(),
        }
    }

    pub async fn describe_table(&mut self, table: &str, schema: Option<&str>) -> Vec<ColumnInfo> {
        match self.adapter.as_mut() {
            Some(adapter) => adapter.describe_table(table, schema).await,
            None => Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.adapter.as_ref().is_some_and(|a| a.is_connected())
    }

    pub fn current_db_type(&self) -> Option<DatabaseType> {
        self.adapter.as_ref().map(|a| a.db_type())
    }

    /// Settings of the live connection.
    pub fn config(&self) -> Option<&DatabaseConfig> {
        self.config.as_ref()
    }

    pub fn connection_info(&self) -> Option<&ConnectionInfo> {
        self.connection_info.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::traits::ConnectParams;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type EventLog = Arc<Mutex<Vec<String>>>;

    struct MockAdapter {
        name: &'static str,
        fail: bool,
        connected: bool,
        events: EventLog,
    }

    impl MockAdapter {
        fn boxed(name: &'static str, fail: bool, events: &EventLog) -> BoxedAdapter {
            Box::new(Self {
                name,
                fail,
                connected: false,
                events: Arc::clone(events),
            })
        }

        fn log(&self, event: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event));
        }
    }

    #[async_trait]
    impl DatabaseAdapter for MockAdapter {
        fn db_type(&self) -> DatabaseType {
            DatabaseType::Sqlite
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn connect(&mut self, _params: &ConnectParams) -> Result<ConnectionInfo, AdapterError> {
            self.log("connect");
            if self.fail {
                return Err(AdapterError::connection("Mock", "refused"));
            }
            self.connected = true;
            Ok(ConnectionInfo::new(format!("mock {}", self.name)))
        }

        async fn disconnect(&mut self) {
            self.log("disconnect");
            self.connected = false;
        }

        async fn execute_query(&mut self, sql: &str) -> QueryResult {
            self.log(&format!("execute {}", sql));
            QueryResult::affected(1)
        }
    }

    #[async_trait]
    impl SchemaIntrospection for MockAdapter {
        async fn list_tables(&mut self, _schema: Option<&str>) -> Vec<TableInfo> {
            vec![TableInfo::new("users")]
        }

        async fn describe_table(&mut self, _table: &str, _schema: Option<&str>) -> Vec<ColumnInfo> {
            vec![ColumnInfo::new("id", "INTEGER")]
        }
    }

    fn events(log: &EventLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_empty_manager() {
        smol::block_on(async {
            let mut manager = ConnectionManager::new();
            assert!(!manager.is_connected());
            assert_eq!(manager.current_db_type(), None);
            assert_eq!(manager.execute("SELECT 1").await, QueryResult::no_connection());
            assert!(manager.list_tables(None).await.is_empty());
            assert!(manager.describe_table("users", None).await.is_empty());
            manager.disconnect().await;
        });
    }

    #[test]
    fn test_reconnect_tears_down_previous_adapter() {
        smol::block_on(async {
            let log = EventLog::default();
            let mut manager = ConnectionManager::new();

            manager
                .connect_adapter(MockAdapter::boxed("a", false, &log), DatabaseConfig::sqlite("a.db"))
                .await
                .unwrap();
            let info = manager
                .connect_adapter(MockAdapter::boxed("b", false, &log), DatabaseConfig::sqlite("b.db"))
                .await
                .unwrap();

            assert_eq!(info.server_version, "mock b");
            assert_eq!(events(&log), vec!["a:connect", "a:disconnect", "b:connect"]);
            assert_eq!(manager.config().unwrap().dbname, "b.db");
            assert!(manager.is_connected());
        });
    }

    #[test]
    fn test_failed_connect_holds_nothing() {
        smol::block_on(async {
            let log = EventLog::default();
            let mut manager = ConnectionManager::new();

            manager
                .connect_adapter(MockAdapter::boxed("a", false, &log), DatabaseConfig::sqlite("a.db"))
                .await
                .unwrap();
            let err = manager
                .connect_adapter(MockAdapter::boxed("b", true, &log), DatabaseConfig::sqlite("b.db"))
                .await
                .unwrap_err();

            assert!(matches!(err, AdapterError::Connection { .. }));
            assert!(!manager.is_connected());
            assert!(manager.config().is_none());
            assert!(manager.connection_info().is_none());
            assert_eq!(
                events(&log),
                vec!["a:connect", "a:disconnect", "b:connect", "b:disconnect"]
            );
        });
    }

    #[test]
    fn test_delegation_and_disconnect() {
        smol::block_on(async {
            let log = EventLog::default();
            let mut manager = ConnectionManager::new();
            manager
                .connect_adapter(MockAdapter::boxed("a", false, &log), DatabaseConfig::sqlite("a.db"))
                .await
                .unwrap();

            assert_eq!(manager.execute("DELETE FROM t").await.affected_rows, Some(1));
            assert_eq!(manager.list_tables(None).await[0].name, "users");
            assert_eq!(manager.describe_table("users", None).await.len(), 1);

            manager.disconnect().await;
            manager.disconnect().await;
            assert!(!manager.is_connected());
            assert_eq!(
                events(&log),
                vec!["a:connect", "a:execute DELETE FROM t", "a:disconnect"]
            );
        });
    }

    #[test]
    fn test_unknown_engine_is_rejected() {
        smol::block_on(async {
            let mut manager = ConnectionManager::new();
            let config = DatabaseConfig::new("oracle", "localhost", 1521, "u", "p", "d");
            let err = manager.connect(config).await.unwrap_err();
            assert!(matches!(err, AdapterError::InvalidArgument(_)));
        });
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_in_memory_round_trip() {
        smol::block_on(async {
            let mut manager = ConnectionManager::new();
            manager.connect(DatabaseConfig::sqlite(":memory:")).await.unwrap();
            assert_eq!(manager.current_db_type(), Some(DatabaseType::Sqlite));

            let created = manager
                .execute("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT NOT NULL)")
                .await;
            assert!(created.success);

            let inserted = manager
                .execute("INSERT INTO items (label) VALUES ('a'), ('b')")
                .await;
            assert_eq!(inserted.affected_rows, Some(2));

            let selected = manager.execute("SELECT label FROM items ORDER BY id").await;
            assert_eq!(selected.row_count, 2);
            assert_eq!(selected.columns, Some(vec!["label".to_string()]));

            let tables = manager.list_tables(None).await;
            assert_eq!(tables.len(), 1);
            assert_eq!(tables[0].row_count, Some(2));

            let columns = manager.describe_table("items", None).await;
            assert!(columns[0].is_primary_key);
            assert!(!columns[1].nullable);

            manager.disconnect().await;
            assert!(!manager.is_connected());
        });
    }
}
