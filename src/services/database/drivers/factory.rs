//! Adapter factory.
//!
//! Maps an engine tag to a fresh, disconnected adapter. Engines whose cargo
//! feature is disabled are still recognised and report which feature to
//! enable.

use tracing::debug;

use crate::services::database::error::AdapterError;
use crate::services::database::traits::{BoxedAdapter, DatabaseType};

/// Factory for creating database adapters from an engine tag.
///
/// # Example
///
/// ```ignore
/// use sqltools_mcp::services::database::drivers::AdapterFactory;
///
/// let adapter = AdapterFactory::create("postgresql")?;
/// assert!(!adapter.is_connected());
/// ```
pub struct AdapterFactory;

impl AdapterFactory {
    /// Create an adapter for a tag such as `mysql`, `pg` or `sqlite3`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The tag names no known engine (`InvalidArgument`)
    /// - The engine's driver was compiled out (`DependencyMissing`)
    /// - The DM8 driver library cannot be located (`NotFound`)
    pub fn create(tag: &str) -> Result<BoxedAdapter, AdapterError> {
        let db_type = DatabaseType::from_tag(tag).ok_or_else(|| {
            AdapterError::InvalidArgument(format!(
                "Unsupported database type: {}. Supported types: {}",
                tag,
                DatabaseType::supported_tags()
            ))
        })?;
        debug!("creating {} adapter for tag '{}'", db_type, tag);
        Self::create_for(db_type)
    }

    /// Create an adapter for an already-resolved engine.
    pub fn create_for(db_type: DatabaseType) -> Result<BoxedAdapter, AdapterError> {
        match db_type {
            #[cfg(feature = "mysql")]
            DatabaseType::MySql => Ok(super::mysql::MySqlAdapter::boxed()),
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => Ok(super::postgres::PostgresAdapter::boxed()),
            #[cfg(feature = "mssql")]
            DatabaseType::Mssql => Ok(super::mssql::MssqlAdapter::boxed()),
            #[cfg(feature = "dm8")]
            DatabaseType::Dm8 => super::dm::DmAdapter::boxed(),
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => Ok(super::sqlite::SqliteAdapter::boxed()),
            #[allow(unreachable_patterns)]
            other => Err(AdapterError::DependencyMissing {
                engine: other.display_name(),
                feature: Self::feature_name(other),
            }),
        }
    }

    /// Cargo feature that compiles in the engine's driver.
    pub fn feature_name(db_type: DatabaseType) -> &'static str {
        match db_type {
            DatabaseType::MySql => "mysql",
            DatabaseType::Postgres => "postgres",
            DatabaseType::Mssql => "mssql",
            DatabaseType::Dm8 => "dm8",
            DatabaseType::Sqlite => "sqlite",
        }
    }

    /// Check if a database type has a driver compiled in.
    pub fn is_supported(db_type: DatabaseType) -> bool {
        match db_type {
            DatabaseType::MySql => cfg!(feature = "mysql"),
            DatabaseType::Postgres => cfg!(feature = "postgres"),
            DatabaseType::Mssql => cfg!(feature = "mssql"),
            DatabaseType::Dm8 => cfg!(feature = "dm8"),
            DatabaseType::Sqlite => cfg!(feature = "sqlite"),
        }
    }

    /// Database types that have a driver compiled in.
    pub fn supported_types() -> Vec<DatabaseType> {
        DatabaseType::all()
            .into_iter()
            .filter(|t| Self::is_supported(*t))
            .collect()
    }

    /// Every known tag, whether or not its driver is compiled in.
    pub fn all_tags() -> Vec<&'static str> {
        DatabaseType::all().iter().map(|t| t.as_tag()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tag_lists_supported_types() {
        let err = AdapterFactory::create("oracle").err().unwrap();
        match err {
            AdapterError::InvalidArgument(msg) => {
                assert_eq!(
                    msg,
                    "Unsupported database type: oracle. Supported types: mysql, postgres, mssql, dm8, sqlite"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_tags_are_case_insensitive() {
        let adapter = AdapterFactory::create("SQLite3").unwrap();
        assert_eq!(adapter.db_type(), DatabaseType::Sqlite);
        assert!(!adapter.is_connected());
    }

    #[cfg(all(feature = "mysql", feature = "postgres", feature = "mssql"))]
    #[test]
    fn test_server_engines_and_synonyms() {
        for (tag, expected) in [
            ("mysql", DatabaseType::MySql),
            ("MariaDB", DatabaseType::MySql),
            ("postgresql", DatabaseType::Postgres),
            ("pg", DatabaseType::Postgres),
            ("sqlserver", DatabaseType::Mssql),
        ] {
            let adapter = AdapterFactory::create(tag).unwrap();
            assert_eq!(adapter.db_type(), expected, "tag {tag}");
        }
    }

    #[cfg(feature = "dm8")]
    #[test]
    fn test_dm8_creation_depends_on_driver() {
        match AdapterFactory::create("dameng") {
            Ok(adapter) => assert_eq!(adapter.db_type(), DatabaseType::Dm8),
            Err(e) => assert!(matches!(e, AdapterError::NotFound(_))),
        }
    }

    #[cfg(not(feature = "dm8"))]
    #[test]
    fn test_dm8_reports_missing_feature() {
        let err = AdapterFactory::create("dm8").err().unwrap();
        assert!(matches!(
            err,
            AdapterError::DependencyMissing { engine: "DM8", feature: "dm8" }
        ));
        assert!(!AdapterFactory::is_supported(DatabaseType::Dm8));
    }

    #[test]
    fn test_all_tags() {
        assert_eq!(
            AdapterFactory::all_tags(),
            vec!["mysql", "postgres", "mssql", "dm8", "sqlite"]
        );
        assert!(AdapterFactory::supported_types().len() <= 5);
    }
}
