//! Configuration management for the Site Inventory Ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with INV__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Storage backend selection
    pub storage: StorageConfig,

    /// Movement ledger settings
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Attempts at recording a movement when a generated reference collides
    pub reference_attempts: u32,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("INV_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "postgres://localhost/site_inventory")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("storage.backend", "postgres")?
            .set_default("ledger.reference_attempts", 3)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (INV_ prefix)
            .add_source(
                Environment::with_prefix("INV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings that would make the service misbehave
    pub fn validate(&self) -> Result<(), AppError> {
        if self.ledger.reference_attempts == 0 {
            return Err(AppError::Configuration(
                "ledger.reference_attempts must be at least 1".to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::Postgres
            && self.database.min_connections > self.database.max_connections
        {
            return Err(AppError::Configuration(
                "database.min_connections cannot exceed database.max_connections".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            reference_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/site_inventory".to_string(),
                max_connections: 10,
                min_connections: 2,
                acquire_timeout_secs: 30,
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
            },
            ledger: LedgerConfig::default(),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.ledger.reference_attempts, 3);
    }

    #[test]
    fn test_zero_reference_attempts_rejected() {
        let mut config = config();
        config.ledger.reference_attempts = 0;
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_pool_bounds_checked_for_postgres_only() {
        let mut config = config();
        config.database.min_connections = 20;
        assert!(config.validate().is_err());

        config.storage.backend = StorageBackend::Memory;
        assert!(config.validate().is_ok());
    }
}
