mod config;

pub use config::{Config, MediaConfig, SuppressionConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/break-reminder[-dev]/` based on BREAK_REMINDER_ENV.
///
/// Set BREAK_REMINDER_ENV=dev to use a development config directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("BREAK_REMINDER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("break-reminder-dev")
    } else {
        base_dir.join("break-reminder")
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
