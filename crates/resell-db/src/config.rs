//! # Configuration
//!
//! Which store to open, for which tenant, and where backups go.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RESELL_TENANT_ID, RESELL_BACKEND, RESELL_DB_PATH,                  │
//! │     RESELL_MAX_CONNECTIONS, RESELL_BACKUP_DIR                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/resell/resell.toml (Linux)                               │
//! │     ~/Library/Application Support/com.resell.shop/resell.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     SQLite in the platform data dir, default tenant                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [tenant]
//! id = "00000000-0000-0000-0000-000000000001"
//!
//! [database]
//! backend = "sqlite"   # sqlite | memory
//! path = "/var/lib/resell/resell.db"
//! max_connections = 5
//!
//! [backup]
//! dir = "/var/lib/resell/backups"
//! safety_backups = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use resell_core::DEFAULT_TENANT_ID;

// =============================================================================
// Store Backend
// =============================================================================

/// Which adapter backs the entity stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// SQLite file through sqlx.
    #[default]
    Sqlite,
    /// Embedded in-process store; nothing survives a restart.
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Sqlite => write!(f, "sqlite"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sql" => Ok(StoreBackend::Sqlite),
            "memory" | "embedded" | "mem" => Ok(StoreBackend::Memory),
            other => Err(DbError::InvalidConfig(format!(
                "Unknown store backend: '{}'. Valid options: sqlite, memory",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Owner identifier threaded through every store call.
    #[serde(default = "default_tenant_id")]
    pub id: String,
}

fn default_tenant_id() -> String {
    DEFAULT_TENANT_ID.to_string()
}

impl Default for TenantConfig {
    fn default() -> Self {
        TenantConfig {
            id: default_tenant_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite file path. Ignored by the memory backend.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Default: 5 (plenty for a single operator)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("resell.db"))
        .unwrap_or_else(|| PathBuf::from("./resell.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            backend: StoreBackend::default(),
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Directory that receives exports and safety backups.
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    /// Write a safety backup of live data before every restore.
    #[serde(default = "default_true")]
    pub safety_backups: bool,
}

fn default_backup_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("backups"))
        .unwrap_or_else(|| PathBuf::from("./backups"))
}

fn default_true() -> bool {
    true
}

impl Default for BackupSettings {
    fn default() -> Self {
        BackupSettings {
            dir: default_backup_dir(),
            safety_backups: true,
        }
    }
}

// =============================================================================
// Resell Config
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResellConfig {
    #[serde(default)]
    pub tenant: TenantConfig,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub backup: BackupSettings,
}

impl ResellConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (resell.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| DbError::ConfigLoadFailed(format!("{}: {}", path.display(), e)))?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Same as [`ResellConfig::load`], falling back to defaults on error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::ConfigLoadFailed(e.to_string()))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.tenant.id.trim().is_empty() {
            return Err(DbError::InvalidConfig("tenant id must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.backup.dir.as_os_str().is_empty() {
            return Err(DbError::InvalidConfig("backup dir must not be empty".into()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("RESELL_TENANT_ID") {
            debug!(tenant_id = %id, "Overriding tenant from environment");
            self.tenant.id = id;
        }

        if let Ok(backend) = std::env::var("RESELL_BACKEND") {
            match backend.parse() {
                Ok(parsed) => self.database.backend = parsed,
                Err(_) => warn!(backend = %backend, "Unknown store backend in environment"),
            }
        }

        if let Ok(path) = std::env::var("RESELL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("RESELL_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse::<u32>() {
                self.database.max_connections = n;
            }
        }

        if let Ok(dir) = std::env::var("RESELL_BACKUP_DIR") {
            debug!(dir = %dir, "Overriding backup dir from environment");
            self.backup.dir = PathBuf::from(dir);
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("resell.toml"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "resell", "shop")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("sqlite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert_eq!("MEMORY".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("embedded".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ResellConfig::default();
        assert_eq!(config.tenant.id, DEFAULT_TENANT_ID);
        assert_eq!(config.database.backend, StoreBackend::Sqlite);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.backup.safety_backups);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ResellConfig::from_toml(
            r#"
            [database]
            backend = "memory"

            [backup]
            dir = "/tmp/resell-backups"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.backup.dir, PathBuf::from("/tmp/resell-backups"));
        assert!(config.backup.safety_backups);
        assert_eq!(config.tenant.id, DEFAULT_TENANT_ID);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ResellConfig::default();
        config.tenant.id = "  ".to_string();
        assert!(config.validate().is_err());

        config.tenant.id = "shop-1".to_string();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 1;
        config.backup.dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_a_load_error() {
        assert!(matches!(
            ResellConfig::from_toml("[database\nbackend ="),
            Err(DbError::ConfigLoadFailed(_))
        ));
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ResellConfig::default()).unwrap();
        assert!(toml_str.contains("[tenant]"));
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[backup]"));
    }
}
