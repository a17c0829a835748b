//! Core error types for cadence-core.
//!
//! Three families of failure reach callers:
//! - [`ValidationError`]: bad input (task text, duration bounds). State is unchanged.
//! - [`InvalidOperation`]: a command that is not allowed right now. State is unchanged.
//! - [`PersistenceError`]: the durable copy could not be read or written. The
//!   in-memory state stays authoritative for the running process.
//!
//! [`ConfigError`] covers the TOML preferences file read by front ends.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for cadence-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation not permitted in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(#[from] InvalidOperation),

    /// Storage read/write errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Task text is empty after trimming
    #[error("task text must not be empty")]
    EmptyTaskText,

    /// Task text exceeds the maximum length
    #[error("task text is {len} characters long (max {max})")]
    TaskTextTooLong { len: usize, max: usize },

    /// Duration outside of the accepted range
    #[error("{field} must be between {min} and {max} minutes, got {value}")]
    DurationOutOfRange {
        field: &'static str,
        value: i64,
        min: u32,
        max: u32,
    },

    /// Duration is not an integer
    #[error("{field} must be a whole number of minutes, got '{value}'")]
    NotANumber { field: &'static str, value: String },
}

/// Commands rejected because of the current cycle state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidOperation {
    /// The active task cannot change while a countdown is running
    #[error("cannot change the active task while the timer is running")]
    TaskSelectionLocked,

    /// Pause requested on a timer that is not counting down
    #[error("timer is not running")]
    NotRunning,
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Reading a key failed
    #[error("failed to read '{key}': {message}")]
    ReadFailed { key: String, message: String },

    /// Writing a key failed (e.g. quota exceeded)
    #[error("failed to write '{key}': {message}")]
    WriteFailed { key: String, message: String },

    /// Stored value could not be decoded
    #[error("corrupt data under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded
    #[error("failed to encode '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to open the backing database
    #[error("failed to open database: {0}")]
    Open(#[from] rusqlite::Error),

    /// IO errors
    #[error("IO error: {0}")]
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

    /// Data directory could not be prepared
    #[error("data directory unavailable: {0}")]
    DataDir(#[from] std::io::Error),
}

impl PersistenceError {
    /// The storage key involved, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            PersistenceError::ReadFailed { key, .. }
            | PersistenceError::WriteFailed { key, .. }
            | PersistenceError::Corrupt { key, .. }
            | PersistenceError::Encode { key, .. } => Some(key),
            PersistenceError::Open(_) | PersistenceError::Io(_) => None,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
