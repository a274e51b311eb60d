//! Core error types for break-reminder-core.
//!
//! Failures coming from the outside world (the windowing host, the media
//! bus) are absorbed by the scheduler and only logged; the types here exist
//! so that the boundaries which *can* fail say precisely how.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for break-reminder-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Windowing/compositor host errors
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Media control bus errors
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// A break session is already live; a second one was rejected.
    #[error("a break session is already active")]
    SessionActive,

    /// The controller has not been started (or was stopped).
    #[error("break controller is not started")]
    NotStarted,

    /// Breaks are suspended while the screen is locked.
    #[error("screen is locked")]
    ScreenLocked,

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    /// The config directory could not be created
    #[error("Failed to prepare config directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Value could not be parsed for the key's type
    #[error("cannot parse '{value}' for '{key}'")]
    ParseFailed { key: String, value: String },
}

/// Validation errors raised at the settings boundary.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Integer setting outside of its supported range
    #[error("'{field}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors reported by the windowing/compositor host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host refused to mount the overlay
    #[error("overlay could not be added: {0}")]
    OverlayRejected(String),

    /// Modal input grab was refused
    #[error("input grab failed: {0}")]
    GrabFailed(String),
}

/// Errors from the media control bus.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The bus client could not be launched
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The bus call ran but reported failure
    #[error("'{command}' failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The D-Bus session bus call failed
    #[error("media bus error: {0}")]
    Bus(String),

    /// The named player is not on the bus
    #[error("player '{0}' not found")]
    PlayerNotFound(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
