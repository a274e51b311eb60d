//! Settings provider boundary.
//!
//! The controller reads two integers, `break-duration` and
//! `countdown-duration`, and subscribes to their change notifications.
//! Whatever the store returns is clamped here so no zero or negative timer
//! can ever be armed.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::warn;

use crate::storage::Config;
use crate::subscription::{ConnectionTable, SubscriptionId};

pub const BREAK_DURATION_KEY: &str = "break-duration";
pub const COUNTDOWN_DURATION_KEY: &str = "countdown-duration";

pub const DEFAULT_INTERVAL_SECS: u64 = 20 * 60;
pub const DEFAULT_COUNTDOWN_SECS: u32 = 20;

pub const MIN_INTERVAL_SECS: u64 = 1;
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const MIN_COUNTDOWN_SECS: u32 = 1;
pub const MAX_COUNTDOWN_SECS: u32 = 60 * 60;

pub trait SettingsProvider {
    fn get_int(&self, key: &str) -> Option<i64>;

    /// Subscribe to change notifications for `key`.
    fn connect(&mut self, key: &str) -> SubscriptionId;

    fn disconnect(&mut self, id: SubscriptionId);
}

pub fn clamp_interval_secs(raw: i64) -> u64 {
    let clamped = raw.clamp(MIN_INTERVAL_SECS as i64, MAX_INTERVAL_SECS as i64) as u64;
    if clamped as i64 != raw {
        warn!(raw, clamped, "break interval out of range; clamped");
    }
    clamped
}

pub fn clamp_countdown_secs(raw: i64) -> u32 {
    let clamped = raw.clamp(i64::from(MIN_COUNTDOWN_SECS), i64::from(MAX_COUNTDOWN_SECS)) as u32;
    if i64::from(clamped) != raw {
        warn!(raw, clamped, "countdown duration out of range; clamped");
    }
    clamped
}

pub fn interval_from<S: SettingsProvider + ?Sized>(settings: &S) -> Duration {
    let secs = match settings.get_int(BREAK_DURATION_KEY) {
        Some(raw) => clamp_interval_secs(raw),
        None => {
            warn!(key = BREAK_DURATION_KEY, "setting missing; using default");
            DEFAULT_INTERVAL_SECS
        }
    };
    Duration::from_secs(secs)
}

pub fn countdown_from<S: SettingsProvider + ?Sized>(settings: &S) -> u32 {
    match settings.get_int(COUNTDOWN_DURATION_KEY) {
        Some(raw) => clamp_countdown_secs(raw),
        None => {
            warn!(key = COUNTDOWN_DURATION_KEY, "setting missing; using default");
            DEFAULT_COUNTDOWN_SECS
        }
    }
}

/// [`SettingsProvider`] over a shared [`Config`] snapshot.
///
/// Clones share both the config and the subscription table, so a file
/// watcher can [`replace`](Self::replace) the config and learn which
/// subscribed keys changed.
#[derive(Debug, Clone)]
pub struct ConfigSettings {
    config: Arc<RwLock<Config>>,
    subscriptions: ConnectionTable<String>,
}

impl ConfigSettings {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            subscriptions: ConnectionTable::new(),
        }
    }

    pub fn snapshot(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_connected(&self, key: &str) -> bool {
        self.subscriptions.is_connected(&key.to_string())
    }

    /// Swap in a new config. Returns the changed keys that have subscribers.
    pub fn replace(&self, config: Config) -> Vec<&'static str> {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let changed: Vec<&'static str> = [BREAK_DURATION_KEY, COUNTDOWN_DURATION_KEY]
            .into_iter()
            .filter(|key| guard.settings_value(key) != config.settings_value(key))
            .filter(|key| self.is_connected(key))
            .collect();
        *guard = config;
        changed
    }
}

impl SettingsProvider for ConfigSettings {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .settings_value(key)
    }

    fn connect(&mut self, key: &str) -> SubscriptionId {
        self.subscriptions.connect(key.to_string())
    }

    fn disconnect(&mut self, id: SubscriptionId) {
        self.subscriptions.disconnect(id);
    }
}

/// Plain in-memory settings, handy for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, i64>,
    subscriptions: ConnectionTable<String>,
}

impl MemorySettings {
    pub fn new(interval_secs: i64, countdown_secs: i64) -> Self {
        let mut settings = Self::default();
        settings.set(BREAK_DURATION_KEY, interval_secs);
        settings.set(COUNTDOWN_DURATION_KEY, countdown_secs);
        settings
    }

    pub fn set(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    pub fn is_connected(&self, key: &str) -> bool {
        self.subscriptions.is_connected(&key.to_string())
    }

    pub fn connection_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl SettingsProvider for MemorySettings {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    fn connect(&mut self, key: &str) -> SubscriptionId {
        self.subscriptions.connect(key.to_string())
    }

    fn disconnect(&mut self, id: SubscriptionId) {
        self.subscriptions.disconnect(id);
    }
}
