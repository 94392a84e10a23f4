//! Startup configuration.
//!
//! The server reads its default connection from `DB_*` environment variables.
//! Parsing goes through a lookup closure so tests never touch the process
//! environment.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::services::database::traits::{ConnectParams, DatabaseType};

pub const ENV_DB_TYPE: &str = "DB_TYPE";
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";
pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_NAME: &str = "DB_NAME";

const DEFAULT_DB_TYPE: &str = "sqlite";
const DEFAULT_HOST: &str = "localhost";

/// Connection settings for one database.
///
/// `port == 0` means the engine's default port. For SQLite `dbname` holds the
/// file path. The password is never serialized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub dbtype: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub dbname: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("dbtype", &self.dbtype)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .field("dbname", &self.dbname)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dbtype: DEFAULT_DB_TYPE.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: 0,
            username: String::new(),
            password: String::new(),
            dbname: String::new(),
        }
    }
}

impl DatabaseConfig {
    pub fn new(
        dbtype: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        dbname: impl Into<String>,
    ) -> Self {
        Self {
            dbtype: dbtype.into(),
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            dbname: dbname.into(),
        }
    }

    /// Settings for a SQLite file (or `:memory:`).
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            dbname: path.into(),
            ..Self::default()
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let dbtype = get(ENV_DB_TYPE)
            .map(|v| v.to_lowercase())
            .unwrap_or_else(|| DEFAULT_DB_TYPE.to_string());

        let port = match get(ENV_DB_PORT) {
            Some(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
                warn!("ignoring invalid {}={}, using the default port", ENV_DB_PORT, raw);
                0
            }),
            None => 0,
        };

        let mut config = Self {
            dbtype,
            host: get(ENV_DB_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            username: get(ENV_DB_USER).unwrap_or_default(),
            password: lookup(ENV_DB_PASSWORD).unwrap_or_default(),
            dbname: get(ENV_DB_NAME).unwrap_or_default(),
        };
        config.port = config.effective_port();
        config
    }

    /// The engine, if the tag is recognised.
    pub fn db_type(&self) -> Option<DatabaseType> {
        DatabaseType::from_tag(&self.dbtype)
    }

    /// The configured port, or the engine default when it is 0.
    pub fn effective_port(&self) -> u16 {
        match (self.port, self.db_type()) {
            (0, Some(db_type)) => db_type.default_port(),
            (port, _) => port,
        }
    }

    /// Whether startup should try to connect with these settings.
    ///
    /// SQLite needs a path; server engines need user, password and database.
    pub fn should_auto_connect(&self) -> bool {
        match self.db_type() {
            Some(DatabaseType::Sqlite) => !self.dbname.is_empty(),
            Some(_) => {
                !self.username.is_empty() && !self.password.is_empty() && !self.dbname.is_empty()
            }
            None => false,
        }
    }

    pub fn to_connect_params(&self) -> ConnectParams {
        ConnectParams::new(
            self.host.clone(),
            self.effective_port(),
            self.username.clone(),
            self.password.clone(),
            self.dbname.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> DatabaseConfig {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        DatabaseConfig::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.dbtype, "sqlite");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 0);
        assert!(!config.should_auto_connect());
    }

    #[test]
    fn test_server_engine_from_env() {
        let config = config_from(&[
            ("DB_TYPE", "MySQL"),
            ("DB_HOST", "db.internal"),
            ("DB_USER", "root"),
            ("DB_PASSWORD", "secret"),
            ("DB_NAME", "app"),
        ]);
        assert_eq!(config.dbtype, "mysql");
        assert_eq!(config.port, 3306);
        assert!(config.should_auto_connect());

        let params = config.to_connect_params();
        assert_eq!(params.host, "db.internal");
        assert_eq!(params.password, "secret");
    }

    #[test]
    fn test_explicit_and_invalid_ports() {
        let config = config_from(&[("DB_TYPE", "postgres"), ("DB_PORT", "6543")]);
        assert_eq!(config.port, 6543);

        let config = config_from(&[("DB_TYPE", "postgres"), ("DB_PORT", "not-a-port")]);
        assert_eq!(config.port, 5432);
    }

    #[test]
    fn test_auto_connect_requires_credentials() {
        let config = config_from(&[("DB_TYPE", "postgres"), ("DB_USER", "u"), ("DB_NAME", "d")]);
        assert!(!config.should_auto_connect());

        let config = config_from(&[("DB_NAME", "/tmp/app.db")]);
        assert!(config.should_auto_connect());

        let config = config_from(&[("DB_TYPE", "oracle"), ("DB_NAME", "x")]);
        assert!(!config.should_auto_connect());
    }

    #[test]
    fn test_password_is_not_serialized() {
        let config = DatabaseConfig::new("mysql", "localhost", 3306, "root", "hunter2", "app");
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "root");
        assert!(!json.to_string().contains("hunter2"));
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
