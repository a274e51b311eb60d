//! Break-cycle controller.
//!
//! [`BreakScheduler`] owns the break timer, the suppression state and the
//! lone overlay session. Everything that can happen to it from outside is a
//! [`ControllerInput`], so a driver only has to forward notifications and
//! call `tick` at the next deadline.

mod controller;
mod state;

use serde::{Deserialize, Serialize};

use crate::media::PlayerStatus;
use crate::overlay::OverlayInput;

pub use controller::{BreakScheduler, ControllerOptions, SNOOZE_INTERVAL};
pub use state::{
    ControllerSnapshot, ControllerState, Lifecycle, ScheduleState, Subscription, TimerHandle,
};

/// Notifications and commands delivered to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControllerInput {
    SettingChanged { key: String },
    ScreenLockChanged { locked: bool },
    FullscreenChanged { active: bool },
    Overlay { input: OverlayInput },
    /// Reply to a `MediaCommand::Enumerate` for break `generation`.
    MediaStatus {
        generation: u64,
        players: Vec<PlayerStatus>,
    },
    TriggerNow,
    Shutdown,
}
