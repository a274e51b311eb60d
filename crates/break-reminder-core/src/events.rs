use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media::PlayerId;
use crate::overlay::BreakOutcome;

/// Why the break timer was (re)armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleReason {
    Started,
    IntervalChanged,
    Completed,
    Snoozed,
    Unlocked,
    Failed,
}

/// Every state change in the controller produces an Event.
/// The daemon drains them after each step; the CLI prints them as JSON lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ControllerStarted {
        interval_secs: u64,
        at: DateTime<Utc>,
    },
    ControllerStopped {
        at: DateTime<Utc>,
    },
    BreakScheduled {
        in_secs: u64,
        reason: ScheduleReason,
        at: DateTime<Utc>,
    },
    /// Screen locked: the break timer is cancelled until unlock.
    TimerSuspended {
        at: DateTime<Utc>,
    },
    /// The timer fired while a fullscreen surface was active.
    BreakDeferred {
        at: DateTime<Utc>,
    },
    BreakStarted {
        countdown_secs: u32,
        at: DateTime<Utc>,
    },
    CountdownTick {
        remaining_secs: u32,
    },
    BreakEnded {
        outcome: BreakOutcome,
        at: DateTime<Utc>,
    },
    /// The overlay could not be shown; treated as a completed break.
    BreakFailed {
        reason: String,
        at: DateTime<Utc>,
    },
    MediaPaused {
        players: Vec<PlayerId>,
    },
    MediaResumed {
        players: Vec<PlayerId>,
    },
}
