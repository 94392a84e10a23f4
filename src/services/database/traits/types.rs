//! Engine identifiers.
//!
//! `DatabaseType` is the closed set of engines the adapters cover, with the
//! tag parsing and default ports used by the factory and the config loader.

use serde::{Deserialize, Serialize};

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    MySql,
    Postgres,
    Mssql,
    Dm8,
    Sqlite,
}

impl DatabaseType {
    /// Get the display name for this database type
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
            Self::Mssql => "SQL Server",
            Self::Dm8 => "DM8",
            Self::Sqlite => "SQLite",
        }
    }

    /// Default port for the engine. File-backed engines report 0.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::MySql => 3306,
            Self::Postgres => 5432,
            Self::Mssql => 1433,
            Self::Dm8 => 5236,
            Self::Sqlite => 0,
        }
    }

    /// Check if this database type is file-based
    pub fn is_file_based(&self) -> bool {
        matches!(self, Self::Sqlite)
    }

    /// All engines, in canonical order.
    pub fn all() -> Vec<DatabaseType> {
        vec![
            Self::MySql,
            Self::Postgres,
            Self::Mssql,
            Self::Dm8,
            Self::Sqlite,
        ]
    }

    /// Parse an engine tag. Case-insensitive, accepts the usual synonyms.
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "mssql" | "sqlserver" => Some(Self::Mssql),
            "dm8" | "dameng" | "dm" => Some(Self::Dm8),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Canonical tag used in responses and error messages.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Mssql => "mssql",
            Self::Dm8 => "dm8",
            Self::Sqlite => "sqlite",
        }
    }

    /// Comma-separated list of canonical tags.
    pub fn supported_tags() -> String {
        Self::all()
            .iter()
            .map(|t| t.as_tag())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
