//! Back-office configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use atelier_db::DbConfig;

/// Back-office configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackofficeConfig {
    /// SQLite database file (`:memory:` for a throwaway database)
    pub db_path: String,

    /// Pool size
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    pub connect_timeout_secs: u64,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

impl BackofficeConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = BackofficeConfig {
            db_path: lookup("ATELIER_DB_PATH").unwrap_or_else(|| "./atelier.db".to_string()),

            max_connections: lookup("ATELIER_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("ATELIER_MAX_CONNECTIONS".to_string()))?,

            connect_timeout_secs: lookup("ATELIER_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("ATELIER_CONNECT_TIMEOUT_SECS".to_string())
                })?,

            run_migrations: lookup("ATELIER_RUN_MIGRATIONS")
                .unwrap_or_else(|| "true".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("ATELIER_RUN_MIGRATIONS".to_string()))?,
        };

        if config.db_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("ATELIER_DB_PATH".to_string()));
        }
        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("ATELIER_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Pool settings for [`atelier_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        let base = if self.db_path == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.db_path)
                .max_connections(self.max_connections)
                .min_connections(1)
        };

        base.connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .run_migrations(self.run_migrations)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
