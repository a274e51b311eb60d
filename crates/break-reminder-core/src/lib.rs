//! # Break Reminder Core Library
//!
//! This library provides the break-cycle controller behind the `break-reminder`
//! CLI: a timer that periodically covers the screen with a dismissable break
//! overlay, holds off while something is fullscreen or the screen is locked,
//! and pauses media players for the length of the break.
//!
//! ## Architecture
//!
//! - **Break Scheduler**: A wall-clock state machine that requires the caller
//!   to invoke `tick()` at `next_deadline()`
//! - **Suppression Policy**: Decides whether a due break may be shown now
//! - **Overlay Session**: One countdown overlay holding the input grab
//! - **Media Controller**: Pause/resume bookkeeping for MPRIS-style players
//! - **Daemon**: Tokio driver wiring the scheduler to a media bus
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`BreakScheduler`]: Core controller state machine
//! - [`Host`]: Compositor boundary (overlays, input grabs, fullscreen query)
//! - [`MediaBus`]: Media player control boundary
//! - [`Config`]: Application configuration management

pub mod daemon;
pub mod error;
pub mod events;
pub mod host;
pub mod media;
pub mod overlay;
pub mod scheduler;
pub mod settings;
pub mod storage;
pub mod subscription;
pub mod suppression;

pub use daemon::Daemon;
pub use error::{ConfigError, CoreError, HostError, MediaError, ValidationError};
pub use events::{Event, ScheduleReason};
pub use host::{Host, HostSignal, OverlayId, OverlayView};
#[cfg(feature = "mpris")]
pub use media::MprisBus;
pub use media::{MediaBus, MediaCommand, MediaController, PlayerId, PlayerStatus, PlayerctlBus};
pub use overlay::{BreakOutcome, OverlayInput, OverlaySession, Presentable};
pub use scheduler::{BreakScheduler, ControllerInput, ControllerOptions, ControllerSnapshot};
pub use settings::{ConfigSettings, MemorySettings, SettingsProvider};
pub use storage::Config;
pub use subscription::{ConnectionTable, SubscriptionId};
pub use suppression::{SuppressionPolicy, SuppressionState};
