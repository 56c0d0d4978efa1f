//! # Scanner Configuration
//!
//! Configuration management for the scan pipeline.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DUPSCAN_DB_PATH=/data/dupscan.db                                   │
//! │     DUPSCAN_SUCCESS_DISPLAY_MS=1500                                    │
//! │     DUPSCAN_LOG=debug                                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/dupscan/scanner.toml (Linux)                             │
//! │     ~/Library/Application Support/com.dupscan.scanner/scanner.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     3000 ms success banner, platform data dir database                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanner.toml
//! [database]
//! path = "/var/lib/dupscan/dupscan.db"
//! max_connections = 4
//!
//! [scan]
//! success_display_ms = 3000
//! detection_buffer = 1
//!
//! [logging]
//! filter = "info,dupscan=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ScanError, ScanResult};
use dupscan_db::DbConfig;

const CONFIG_FILE_NAME: &str = "scanner.toml";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "dupscan", "scanner")
}

// =============================================================================
// Database Settings
// =============================================================================

/// Where the Store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("dupscan.db"))
        .unwrap_or_else(|| PathBuf::from("dupscan.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSettings {
    /// Builds the pool configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.path.clone()).max_connections(self.max_connections)
    }
}

// =============================================================================
// Scan Settings
// =============================================================================

/// Scan session behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    /// How long the success banner stays up before the gate reopens.
    #[serde(default = "default_success_display_ms")]
    pub success_display_ms: u64,

    /// Capacity of the frame worker → session channel. The gate already
    /// limits it to one in-flight value.
    #[serde(default = "default_detection_buffer")]
    pub detection_buffer: usize,
}

fn default_success_display_ms() -> u64 {
    3000
}

fn default_detection_buffer() -> usize {
    1
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            success_display_ms: default_success_display_ms(),
            detection_buffer: default_detection_buffer(),
        }
    }
}

impl ScanSettings {
    /// Returns the success display timeout.
    pub fn success_display(&self) -> Duration {
        Duration::from_millis(self.success_display_ms)
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

/// Tracing filter used when `RUST_LOG` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    crate::logging::DEFAULT_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Main Scanner Configuration
// =============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub scan: ScanSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ScannerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ScanResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
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

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scanner config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ScanResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ScanError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scanner config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ScanResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ScanError::InvalidConfig("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ScanError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.scan.success_display_ms == 0 {
            return Err(ScanError::InvalidConfig(
                "scan.success_display_ms must be greater than 0".into(),
            ));
        }

        // tokio's mpsc panics on a zero-capacity channel
        if self.scan.detection_buffer == 0 {
            return Err(ScanError::InvalidConfig(
                "scan.detection_buffer must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("DUPSCAN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(ms) = std::env::var("DUPSCAN_SUCCESS_DISPLAY_MS") {
            match ms.parse::<u64>() {
                Ok(ms) => self.scan.success_display_ms = ms,
                Err(_) => warn!(value = %ms, "Ignoring non-numeric DUPSCAN_SUCCESS_DISPLAY_MS"),
            }
        }

        if let Ok(filter) = std::env::var("DUPSCAN_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert_eq!(config.scan.success_display_ms, 3000);
        assert_eq!(config.scan.success_display(), Duration::from_secs(3));
        assert_eq!(config.scan.detection_buffer, 1);
        assert_eq!(config.logging.filter, crate::logging::DEFAULT_FILTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScannerConfig::default();

        config.scan.success_display_ms = 0;
        assert!(config.validate().is_err());

        config.scan.success_display_ms = 10;
        config.scan.detection_buffer = 0;
        assert!(config.validate().is_err());

        config.scan.detection_buffer = 1;
        config.database.max_connections = 0;
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [scan]
            success_display_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.scan.success_display_ms, 1500);
        assert_eq!(config.scan.detection_buffer, 1);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = ScannerConfig::default();
        config.database.path = dir.path().join("scan.db");
        config.scan.success_display_ms = 1200;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[database]"));
        assert!(contents.contains("[scan]"));

        let loaded: ScannerConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.scan.success_display_ms, 1200);
        assert_eq!(loaded.database.path, dir.path().join("scan.db"));
    }

    #[test]
    fn test_invalid_toml_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[scan\nsuccess_display_ms = ").unwrap();

        let err = ScannerConfig::load(Some(path.clone())).unwrap_err();
        assert!(err.is_config_error());

        // load_or_default falls back instead of failing
        let config = ScannerConfig::load_or_default(Some(path));
        assert_eq!(config.scan.success_display_ms, 3000);
    }
}
