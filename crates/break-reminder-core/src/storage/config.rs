//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Break interval and overlay countdown
//! - Overlay message text
//! - Media pause strategy and late-reply policy
//! - Fullscreen suppression
//!
//! Configuration is stored at `~/.config/break-reminder/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, ValidationError};
use crate::host::DEFAULT_MESSAGE;
use crate::media::{LateReplyPolicy, PauseStrategy};
use crate::settings::{BREAK_DURATION_KEY, COUNTDOWN_DURATION_KEY};

/// Break interval bounds in seconds (5 to 120 minutes).
pub const BREAK_DURATION_RANGE: (i64, i64) = (5 * 60, 120 * 60);
/// Overlay countdown bounds in seconds.
pub const COUNTDOWN_DURATION_RANGE: (i64, i64) = (5, 60);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub pause_strategy: PauseStrategy,
    #[serde(default)]
    pub late_reply: LateReplyPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionConfig {
    #[serde(default = "default_true")]
    pub respect_fullscreen: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/break-reminder/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between breaks.
    #[serde(default = "default_break_duration")]
    pub break_duration: u64,
    /// Seconds the overlay stays up before it closes itself.
    #[serde(default = "default_countdown_duration")]
    pub countdown_duration: u32,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub suppression: SuppressionConfig,
}

fn default_break_duration() -> u64 {
    20 * 60
}
fn default_countdown_duration() -> u32 {
    20
}
fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}
fn default_true() -> bool {
    true
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            respect_fullscreen: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            break_duration: default_break_duration(),
            countdown_duration: default_countdown_duration(),
            message: default_message(),
            media: MediaConfig::default(),
            suppression: SuppressionConfig::default(),
        }
    }
}

fn check_range(field: &str, value: i64, (min, max): (i64, i64)) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl Config {
    fn lookup<'a>(root: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }
        key.split('.').try_fold(root, |current, part| current.get(part))
    }

    fn assign(root: &mut serde_json::Value, key: &str, value: &str) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let unparsable = || ConfigError::ParseFailed {
            key: key.to_string(),
            value: value.to_string(),
        };

        let (parent, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent) = parent {
            for part in parent.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => {
                serde_json::Value::Bool(value.parse::<bool>().map_err(|_| unparsable())?)
            }
            serde_json::Value::Number(_) => {
                serde_json::Value::Number(value.parse::<u64>().map_err(|_| unparsable())?.into())
            }
            // Message text may contain literal "\n" from a shell.
            serde_json::Value::String(_) => serde_json::Value::String(value.replace("\\n", "\n")),
            _ => return Err(unknown()),
        };
        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        toml::from_str(&content).map_err(|e| load_failed(e.to_string()))
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::lookup(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key. The result must still validate;
    /// on error `self` is left untouched.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), crate::error::CoreError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::assign(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|_| ConfigError::ParseFailed {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range(
            "break_duration",
            i64::try_from(self.break_duration).unwrap_or(i64::MAX),
            BREAK_DURATION_RANGE,
        )?;
        check_range(
            "countdown_duration",
            i64::from(self.countdown_duration),
            COUNTDOWN_DURATION_RANGE,
        )?;
        if self.message.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "message".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Sections that differ from `other` and only take effect on restart.
    pub fn restart_required(&self, other: &Config) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.message != other.message {
            fields.push("message");
        }
        if self.media != other.media {
            fields.push("media");
        }
        if self.suppression != other.suppression {
            fields.push("suppression");
        }
        fields
    }

    /// Integer value for an external settings key.
    pub fn settings_value(&self, key: &str) -> Option<i64> {
        match key {
            BREAK_DURATION_KEY => i64::try_from(self.break_duration).ok(),
            COUNTDOWN_DURATION_KEY => Some(i64::from(self.countdown_duration)),
            _ => None,
        }
    }
}
