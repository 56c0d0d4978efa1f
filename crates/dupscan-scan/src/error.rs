//! # Scan Error Types
//!
//! Error types for the scan pipeline.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Session      │  │     Database            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Rejected       │  │  Database(DbError)      │ │
//! │  │  ConfigLoad     │  │  SessionClosed  │  │                         │ │
//! │  │  ConfigSave     │  │  WorkerSpawn    │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  DecodeError never leaves the decoder boundary: it becomes             │
//! │  "no detection" and is logged at trace level.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use dupscan_core::CoreError;
use dupscan_db::DbError;
use thiserror::Error;

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors reported to callers of the scan pipeline.
#[derive(Debug, Error)]
pub enum ScanError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scanner configuration.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// The command is not valid in the current scan state.
    #[error("Command rejected: {0}")]
    Rejected(#[from] CoreError),

    /// The session task has stopped.
    #[error("Scan session is closed")]
    SessionClosed,

    /// The frame worker thread could not be started.
    #[error("Failed to start frame worker: {0}")]
    WorkerSpawnFailed(String),

    /// The session task or worker ended abnormally.
    #[error("Internal error: {0}")]
    Internal(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Store operation failed outside a scan cycle.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl ScanError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidConfig(_)
                | ScanError::ConfigLoadFailed(_)
                | ScanError::ConfigSaveFailed(_)
        )
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ScanError {
    fn from(err: toml::ser::Error) -> Self {
        ScanError::ConfigSaveFailed(err.to_string())
    }
}

/// A frame could not be decoded.
///
/// Decoders return this; the pipeline treats it exactly like an empty
/// result.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame's pixel data could not be interpreted.
    #[error("Unreadable frame: {0}")]
    UnreadableFrame(String),

    /// The decoder itself failed.
    #[error("Decoder failure: {0}")]
    DecoderFailed(String),
}
