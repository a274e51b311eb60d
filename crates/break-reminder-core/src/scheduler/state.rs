use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::media::PlayerId;
use crate::overlay::OverlaySession;
use crate::subscription::SubscriptionId;
use crate::suppression::SuppressionState;

/// One arming of the break timer. A newer arming invalidates older handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    generation: u64,
}

impl TimerHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The one-shot break timer.
#[derive(Debug, Clone)]
pub struct ScheduleState {
    pub pending_timer: Option<TimerHandle>,
    pub interval_seconds: u64,
    pub next_fire: Option<Instant>,
    generation: u64,
}

impl ScheduleState {
    pub fn new(interval_seconds: u64) -> Self {
        Self {
            pending_timer: None,
            interval_seconds: interval_seconds.max(1),
            next_fire: None,
            generation: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn is_armed(&self) -> bool {
        self.pending_timer.is_some()
    }

    /// Replace any pending timer with one firing `delay` after `now`.
    pub fn arm(&mut self, delay: Duration, now: Instant) -> TimerHandle {
        self.cancel();
        self.generation += 1;
        let handle = TimerHandle {
            generation: self.generation,
        };
        self.pending_timer = Some(handle);
        self.next_fire = Some(now + delay);
        handle
    }

    pub fn cancel(&mut self) -> Option<TimerHandle> {
        self.next_fire = None;
        self.pending_timer.take()
    }

    /// Consume the timer if it is due. A timer fires at most once per arming.
    pub fn take_due(&mut self, now: Instant) -> Option<TimerHandle> {
        match self.next_fire {
            Some(at) if at <= now => self.cancel(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Stopped,
    Running,
}

/// A live subscription, released in `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Settings(SubscriptionId),
    Host(SubscriptionId),
}

/// Everything the scheduler mutates, in one owned place.
#[derive(Debug)]
pub struct ControllerState {
    pub lifecycle: Lifecycle,
    pub schedule: ScheduleState,
    pub suppression: SuppressionState,
    pub session: Option<OverlaySession>,
    /// Countdown for the next session. A live session keeps its own.
    pub countdown_seconds: u32,
    /// Bumped for every break; tags the media enumeration it requests.
    pub break_generation: u64,
    pub subscriptions: Vec<Subscription>,
}

impl ControllerState {
    pub fn new(interval_seconds: u64, countdown_seconds: u32) -> Self {
        Self {
            lifecycle: Lifecycle::Stopped,
            schedule: ScheduleState::new(interval_seconds),
            suppression: SuppressionState::default(),
            session: None,
            countdown_seconds: countdown_seconds.max(1),
            break_generation: 0,
            subscriptions: Vec::new(),
        }
    }
}

/// Serializable view of the controller for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub lifecycle: Lifecycle,
    pub interval_secs: u64,
    pub countdown_secs: u32,
    pub next_break_in_secs: Option<u64>,
    pub suppression: SuppressionState,
    pub break_active: bool,
    pub countdown_remaining: Option<u32>,
    pub remembered_players: Vec<PlayerId>,
    pub late_players: Vec<PlayerId>,
}
