//! Core error types for breathwork-core.
//!
//! This module defines the error hierarchy using thiserror. Invalid input and
//! out-of-state commands are reported to the caller; collaborator failures
//! during a session are logged by the runner and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathwork-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Session command errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Routine and round validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Preset routines are read-only
    #[error("Routine '{0}' is a preset and cannot be modified")]
    PresetReadOnly(String),
}

/// Errors returned by session commands.
///
/// These indicate a caller/state desync and are never produced by timer fires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The routine handed to `start()` failed validation
    #[error("Invalid routine: {0}")]
    InvalidRoutine(#[from] ValidationError),

    /// `start()` while another session is running
    #[error("A session is already active")]
    AlreadyActive,

    /// Command issued with no session started
    #[error("No active session")]
    NoActiveSession,

    /// `resume()` on a session that is not paused
    #[error("Session is not paused")]
    NotPaused,

    /// Command issued after the session completed
    #[error("Session already finished")]
    SessionFinished,

    /// The driver loop has stopped and no longer accepts commands
    #[error("Session driver is no longer running")]
    DriverClosed,
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    /// A stored record could not be decoded
    #[error("Malformed record '{key}': {message}")]
    Decode { key: String, message: String },

    /// A stored record carries a version this build does not understand
    #[error("Unsupported record version {version} for '{key}'")]
    UnsupportedVersion { key: String, version: u32 },

    /// Record lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record rejected before write
    #[error("Rejected: {0}")]
    Rejected(#[from] ValidationError),

    /// Data directory unavailable
    #[error("Data directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
