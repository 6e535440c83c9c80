//! # Configuration
//!
//! Loads Mortar's settings and turns them into a [`DbConfig`].
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MORTAR_DB_PATH=/var/lib/mortar/mortar.db                           │
//! │     MORTAR_DB_MAX_CONNECTIONS=8                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/mortar/mortar.toml (Linux)                               │
//! │     ~/Library/Application Support/com.mortar.pharmacy/mortar.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "mortar.db"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//!
//! [catalogue]
//! page_size = 10
//! search_limit = 10
//! low_stock_limit = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::{DbConfig, Listing};

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Relative paths resolve against the working directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mortar.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

// =============================================================================
// Catalogue Settings
// =============================================================================

/// `[catalogue]` section: listing and lookup sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueSettings {
    /// Rows per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum hits returned by the medicine search lookup.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    /// Rows shown in the low-stock report.
    #[serde(default = "default_low_stock_limit")]
    pub low_stock_limit: u32,
}

fn default_page_size() -> u32 {
    10
}

fn default_search_limit() -> u32 {
    10
}

fn default_low_stock_limit() -> u32 {
    5
}

impl Default for CatalogueSettings {
    fn default() -> Self {
        CatalogueSettings {
            page_size: default_page_size(),
            search_limit: default_search_limit(),
            low_stock_limit: default_low_stock_limit(),
        }
    }
}

// =============================================================================
// App Configuration
// =============================================================================

/// Complete Mortar configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub catalogue: CatalogueSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`mortar.toml`), if it exists
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections cannot exceed max_connections".into(),
            ));
        }

        if self.catalogue.page_size == 0 || self.catalogue.search_limit == 0 {
            return Err(ConfigError::Invalid(
                "catalogue.page_size and catalogue.search_limit must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MORTAR_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("MORTAR_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid MORTAR_DB_MAX_CONNECTIONS"),
            }
        }

        if let Ok(timeout) = std::env::var("MORTAR_DB_CONNECT_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(n) => self.database.connect_timeout_secs = n,
                Err(_) => warn!(value = %timeout, "Ignoring invalid MORTAR_DB_CONNECT_TIMEOUT_SECS"),
            }
        }

        if let Ok(size) = std::env::var("MORTAR_PAGE_SIZE") {
            match size.parse::<u32>() {
                Ok(n) => self.catalogue.page_size = n,
                Err(_) => warn!(value = %size, "Ignoring invalid MORTAR_PAGE_SIZE"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "mortar", "pharmacy")
            .map(|dirs| dirs.config_dir().join("mortar.toml"))
    }

    /// Builds the database configuration from these settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .listing(Listing {
                per_page: self.catalogue.page_size,
                search_limit: self.catalogue.search_limit,
                low_stock_limit: self.catalogue.low_stock_limit,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.path, PathBuf::from("mortar.db"));
        assert_eq!(config.catalogue.page_size, 10);
        assert_eq!(config.catalogue.search_limit, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/pharmacy.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/pharmacy.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.catalogue.search_limit, 10);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.min_connections = 9;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.catalogue.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_and_save_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mortar.toml");

        let mut config = AppConfig::default();
        config.catalogue.low_stock_limit = 20;
        config.save(Some(path.clone())).unwrap();

        let loaded = AppConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.catalogue.low_stock_limit, 20);
    }

    #[test]
    fn test_db_config_conversion() {
        let mut config = AppConfig::default();
        config.catalogue.page_size = 25;
        let db = config.db_config();
        assert_eq!(db.listing.per_page, 25);
        assert_eq!(db.max_connections, 5);
    }
}
