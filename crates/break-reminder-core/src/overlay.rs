//! Overlay session: one on-screen break presentation.
//!
//! ## State Transitions
//!
//! ```text
//! Created -> Showing -> Closing -> Destroyed
//!    |          |                     ^
//!    +----------+---- teardown -------+
//! ```
//!
//! A session reports its outcome at most once. Forced teardown goes straight
//! to `Destroyed` and reports nothing, since the owner initiated it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::HostError;
use crate::host::{GrabHandle, Host, OverlayId, OverlayView};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakOutcome {
    Pending,
    ClosedByUser,
    TimedOut,
    Snoozed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayState {
    Created,
    Showing,
    Closing,
    Destroyed,
}

/// User input routed to the overlay while it holds the grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayInput {
    CloseClicked,
    EscapePressed,
    SnoozeClicked,
    OtherKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakSession {
    pub countdown_remaining: u32,
    pub started_at: DateTime<Utc>,
    pub outcome: BreakOutcome,
}

/// Capability interface for something the host can present modally.
pub trait Presentable {
    fn show(&mut self, host: &mut dyn Host, now: Instant) -> Result<(), HostError>;

    /// Forced teardown: no outcome is reported.
    fn hide(&mut self, host: &mut dyn Host);

    /// Returns the final outcome when this input closed the presentation.
    fn on_input(&mut self, host: &mut dyn Host, input: OverlayInput) -> Option<BreakOutcome>;
}

#[derive(Debug)]
pub struct OverlaySession {
    state: OverlayState,
    session: BreakSession,
    view: OverlayView,
    overlay: Option<OverlayId>,
    grab: Option<GrabHandle>,
    next_tick: Option<Instant>,
    notified: bool,
}

impl OverlaySession {
    pub fn new(countdown_secs: u32, message: impl Into<String>) -> Self {
        let countdown = countdown_secs.max(1);
        Self {
            state: OverlayState::Created,
            session: BreakSession {
                countdown_remaining: countdown,
                started_at: Utc::now(),
                outcome: BreakOutcome::Pending,
            },
            view: OverlayView::new(message, countdown),
            overlay: None,
            grab: None,
            next_tick: None,
            notified: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn session(&self) -> &BreakSession {
        &self.session
    }

    pub fn remaining(&self) -> u32 {
        self.session.countdown_remaining
    }

    pub fn is_showing(&self) -> bool {
        self.state == OverlayState::Showing
    }

    /// When the next countdown tick is due, if the countdown is running.
    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Process every countdown tick due at `now`.
    pub fn tick(&mut self, host: &mut dyn Host, now: Instant) -> Option<BreakOutcome> {
        if self.state != OverlayState::Showing {
            return None;
        }
        while let Some(due) = self.next_tick {
            if due > now {
                break;
            }
            self.session.countdown_remaining = self.session.countdown_remaining.saturating_sub(1);
            self.view.countdown = self.session.countdown_remaining;
            if self.session.countdown_remaining == 0 {
                return self.close(host, BreakOutcome::TimedOut);
            }
            if let Some(id) = self.overlay {
                host.update_overlay(id, &self.view);
            }
            self.next_tick = Some(due + TICK);
        }
        None
    }

    pub fn on_close_requested(&mut self, host: &mut dyn Host) -> Option<BreakOutcome> {
        self.close(host, BreakOutcome::ClosedByUser)
    }

    pub fn on_snooze_requested(&mut self, host: &mut dyn Host) -> Option<BreakOutcome> {
        self.close(host, BreakOutcome::Snoozed)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn close(&mut self, host: &mut dyn Host, outcome: BreakOutcome) -> Option<BreakOutcome> {
        if self.state != OverlayState::Showing {
            return None;
        }
        self.state = OverlayState::Closing;
        self.session.outcome = outcome;
        self.next_tick = None;
        self.release(host);
        self.state = OverlayState::Destroyed;

        if self.notified {
            return None;
        }
        self.notified = true;
        debug!(?outcome, "break overlay closed");
        Some(outcome)
    }

    fn release(&mut self, host: &mut dyn Host) {
        if let Some(grab) = self.grab.take() {
            host.pop_input_grab(grab);
        }
        if let Some(id) = self.overlay.take() {
            host.remove_overlay(id);
        }
    }
}

impl Presentable for OverlaySession {
    fn show(&mut self, host: &mut dyn Host, now: Instant) -> Result<(), HostError> {
        if self.state != OverlayState::Created {
            warn!(state = ?self.state, "overlay session shown twice; ignoring");
            return Ok(());
        }

        let id = match host.add_fullscreen_overlay(&self.view) {
            Ok(id) => id,
            Err(e) => {
                self.state = OverlayState::Destroyed;
                self.notified = true;
                return Err(e);
            }
        };
        self.overlay = Some(id);

        match host.push_input_grab(id) {
            Ok(grab) => self.grab = Some(grab),
            Err(e) => {
                self.release(host);
                self.state = OverlayState::Destroyed;
                self.notified = true;
                return Err(e);
            }
        }

        self.state = OverlayState::Showing;
        self.session.started_at = Utc::now();
        self.next_tick = Some(now + TICK);
        Ok(())
    }

    fn hide(&mut self, host: &mut dyn Host) {
        if self.state == OverlayState::Destroyed {
            return;
        }
        self.next_tick = None;
        self.release(host);
        self.state = OverlayState::Destroyed;
        self.notified = true;
    }

    fn on_input(&mut self, host: &mut dyn Host, input: OverlayInput) -> Option<BreakOutcome> {
        match input {
            OverlayInput::CloseClicked | OverlayInput::EscapePressed => self.on_close_requested(host),
            OverlayInput::SnoozeClicked => self.on_snooze_requested(host),
            OverlayInput::OtherKey => None,
        }
    }
}
