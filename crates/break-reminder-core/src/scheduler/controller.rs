//! Break scheduler: owns the break timer and drives one break cycle at a time.
//!
//! Like the overlay countdown it is a wall-clock state machine with no
//! internal threads. The caller feeds it inputs and calls [`tick`] at
//! [`next_deadline`]; side effects toward the media bus are queued as
//! commands and every transition is recorded as an [`Event`].
//!
//! ```text
//! armed --fire--> [fullscreen?] --yes--> deferred --fullscreen ends--> break
//!                       |                                              |
//!                       +-------------------no---------------------> break
//! break --closed/timed out--> armed(interval)
//! break --snoozed-----------> armed(1h)
//! ```
//!
//! [`tick`]: BreakScheduler::tick
//! [`next_deadline`]: BreakScheduler::next_deadline

use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::state::{ControllerSnapshot, ControllerState, Lifecycle, Subscription};
use super::ControllerInput;
use crate::error::{CoreError, Result};
use crate::events::{Event, ScheduleReason};
use crate::host::{Host, HostSignal, DEFAULT_MESSAGE};
use crate::media::{LateReplyPolicy, MediaCommand, MediaController, PauseStrategy, PlayerStatus};
use crate::overlay::{BreakOutcome, OverlayInput, OverlaySession, Presentable};
use crate::settings::{self, SettingsProvider, BREAK_DURATION_KEY, COUNTDOWN_DURATION_KEY};
use crate::storage::Config;
use crate::suppression::{SuppressionPolicy, SuppressionState};

/// Delay after the user snoozes, regardless of the configured interval.
pub const SNOOZE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub message: String,
    pub suppression: SuppressionPolicy,
    pub pause_strategy: PauseStrategy,
    pub late_reply: LateReplyPolicy,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            message: DEFAULT_MESSAGE.to_string(),
            suppression: SuppressionPolicy::default(),
            pause_strategy: PauseStrategy::default(),
            late_reply: LateReplyPolicy::default(),
        }
    }
}

impl From<&Config> for ControllerOptions {
    fn from(config: &Config) -> Self {
        Self {
            message: config.message.clone(),
            suppression: SuppressionPolicy::new(config.suppression.respect_fullscreen),
            pause_strategy: config.media.pause_strategy,
            late_reply: config.media.late_reply,
        }
    }
}

pub struct BreakScheduler<H, S> {
    host: H,
    settings: S,
    policy: SuppressionPolicy,
    media: MediaController,
    message: String,
    state: ControllerState,
    events: Vec<Event>,
}

impl<H: Host, S: SettingsProvider> BreakScheduler<H, S> {
    pub fn new(host: H, settings: S, options: ControllerOptions) -> Self {
        let interval = settings::interval_from(&settings).as_secs();
        let countdown = settings::countdown_from(&settings);
        Self {
            host,
            settings,
            policy: options.suppression,
            media: MediaController::new(options.pause_strategy, options.late_reply),
            message: options.message,
            state: ControllerState::new(interval, countdown),
            events: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut S {
        &mut self.settings
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn media(&self) -> &MediaController {
        &self.media
    }

    pub fn is_started(&self) -> bool {
        self.state.lifecycle == Lifecycle::Running
    }

    pub fn is_break_active(&self) -> bool {
        self.state.session.is_some()
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let countdown = self
            .state
            .session
            .as_ref()
            .and_then(OverlaySession::next_tick);
        match (self.state.schedule.next_fire, countdown) {
            (Some(fire), Some(tick)) => Some(fire.min(tick)),
            (fire, tick) => fire.or(tick),
        }
    }

    pub fn snapshot(&self, now: Instant) -> ControllerSnapshot {
        ControllerSnapshot {
            lifecycle: self.state.lifecycle,
            interval_secs: self.state.schedule.interval_seconds,
            countdown_secs: self.state.countdown_seconds,
            next_break_in_secs: self
                .state
                .schedule
                .next_fire
                .map(|at| at.saturating_duration_since(now).as_secs()),
            suppression: self.state.suppression,
            break_active: self.is_break_active(),
            countdown_remaining: self.state.session.as_ref().map(OverlaySession::remaining),
            remembered_players: self.media.remembered().iter().cloned().collect(),
            late_players: self.media.late_record().iter().cloned().collect(),
        }
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn take_media_commands(&mut self) -> Vec<MediaCommand> {
        self.media.take_commands()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Subscribe to notifications and arm the timer. Calling it again
    /// re-arms from `now` without subscribing twice.
    pub fn start(&mut self, now: Instant) {
        if self.is_started() {
            debug!("controller already started; re-arming");
            self.state.schedule.cancel();
        } else {
            self.subscribe();
            self.state.lifecycle = Lifecycle::Running;
            self.state.suppression = SuppressionState {
                is_fullscreen_active: self.host.is_any_output_fullscreen(),
                ..SuppressionState::default()
            };
        }

        let interval = settings::interval_from(&self.settings);
        self.state.schedule.interval_seconds = interval.as_secs();
        self.state.countdown_seconds = settings::countdown_from(&self.settings);
        info!(interval_secs = interval.as_secs(), "break controller started");
        self.events.push(Event::ControllerStarted {
            interval_secs: interval.as_secs(),
            at: Utc::now(),
        });

        if self.state.session.is_none() && !self.state.suppression.is_screen_locked {
            self.arm(interval, ScheduleReason::Started, now);
        }
    }

    /// Cancel the timer, drop every subscription and tear down a live
    /// overlay without reporting an outcome. Safe to call at any time.
    pub fn stop(&mut self) {
        if !self.is_started() {
            return;
        }
        self.state.schedule.cancel();

        for subscription in self.state.subscriptions.drain(..) {
            match subscription {
                Subscription::Settings(id) => self.settings.disconnect(id),
                Subscription::Host(id) => self.host.disconnect(id),
            }
        }

        if let Some(mut session) = self.state.session.take() {
            session.hide(&mut self.host);
        }
        self.resume_media();

        self.state.suppression = SuppressionState::default();
        self.state.lifecycle = Lifecycle::Stopped;
        info!("break controller stopped");
        self.events.push(Event::ControllerStopped { at: Utc::now() });
    }

    // ── Inputs ───────────────────────────────────────────────────────

    pub fn handle(&mut self, input: ControllerInput, now: Instant) {
        match input {
            ControllerInput::SettingChanged { key } => self.on_setting_changed(&key, now),
            ControllerInput::ScreenLockChanged { locked } => self.on_screen_lock_changed(locked, now),
            ControllerInput::FullscreenChanged { active } => self.on_fullscreen_changed(active, now),
            ControllerInput::Overlay { input } => self.on_overlay_input(input, now),
            ControllerInput::MediaStatus {
                generation,
                players,
            } => self.on_media_status(generation, players),
            ControllerInput::TriggerNow => {
                if let Err(e) = self.trigger_now(now) {
                    warn!(error = %e, "manual break rejected");
                }
            }
            ControllerInput::Shutdown => self.stop(),
        }
    }

    pub fn on_setting_changed(&mut self, key: &str, now: Instant) {
        if !self.is_started() {
            return;
        }
        match key {
            BREAK_DURATION_KEY => {
                let interval = settings::interval_from(&self.settings);
                self.on_interval_changed(interval.as_secs(), now);
            }
            COUNTDOWN_DURATION_KEY => {
                let countdown = settings::countdown_from(&self.settings);
                self.on_countdown_changed(countdown);
            }
            other => debug!(key = other, "ignoring unrelated setting"),
        }
    }

    /// Full reset: the wait restarts from `now` with the new interval.
    pub fn on_interval_changed(&mut self, new_interval_seconds: u64, now: Instant) {
        if !self.is_started() {
            return;
        }
        let secs = settings::clamp_interval_secs(i64::try_from(new_interval_seconds).unwrap_or(i64::MAX));
        self.state.schedule.interval_seconds = secs;

        if self.state.session.is_some() || self.state.suppression.is_screen_locked {
            debug!(secs, "interval updated; timer re-arms when the break or lock ends");
            return;
        }
        self.arm(Duration::from_secs(secs), ScheduleReason::IntervalChanged, now);
    }

    /// Takes effect from the next session; a live countdown is left alone.
    pub fn on_countdown_changed(&mut self, new_countdown_seconds: u32) {
        if !self.is_started() {
            return;
        }
        let secs = settings::clamp_countdown_secs(i64::from(new_countdown_seconds));
        debug!(secs, "countdown duration updated");
        self.state.countdown_seconds = secs;
    }

    pub fn on_screen_lock_changed(&mut self, locked: bool, now: Instant) {
        if !self.is_started() || self.state.suppression.is_screen_locked == locked {
            return;
        }
        self.state.suppression.is_screen_locked = locked;

        if locked {
            self.state.schedule.cancel();
            info!("screen locked; break timer suspended");
            self.events.push(Event::TimerSuspended { at: Utc::now() });
            return;
        }

        if self.state.session.is_some() {
            return;
        }
        if self.state.suppression.break_deferred {
            // Still fullscreen: the fullscreen-ended signal will show it.
            if self.policy.can_show_break_now(&self.host) {
                self.state.suppression.break_deferred = false;
                self.begin_break(now);
            }
            return;
        }
        let interval = self.state.schedule.interval();
        self.arm(interval, ScheduleReason::Unlocked, now);
    }

    pub fn on_fullscreen_changed(&mut self, active: bool, now: Instant) {
        if !self.is_started() {
            return;
        }
        self.state.suppression.is_fullscreen_active = active;
        if active || !self.state.suppression.break_deferred || self.state.suppression.is_screen_locked {
            return;
        }
        self.state.suppression.break_deferred = false;
        info!("fullscreen ended; showing deferred break");
        self.begin_break(now);
    }

    pub fn on_overlay_input(&mut self, input: OverlayInput, now: Instant) {
        let Some(session) = self.state.session.as_mut() else {
            debug!(?input, "overlay input with no break on screen");
            return;
        };
        if let Some(outcome) = session.on_input(&mut self.host, input) {
            self.complete(outcome, now);
        }
    }

    pub fn on_media_status(&mut self, generation: u64, players: Vec<PlayerStatus>) {
        let paused = self.media.on_status_reply(generation, players);
        if !paused.is_empty() {
            self.events.push(Event::MediaPaused { players: paused });
        }
    }

    /// Advance the countdown and fire the break timer if due.
    pub fn tick(&mut self, now: Instant) {
        if !self.is_started() {
            return;
        }

        if let Some(session) = self.state.session.as_mut() {
            let before = session.remaining();
            let outcome = session.tick(&mut self.host, now);
            let after = session.remaining();
            match outcome {
                Some(outcome) => self.complete(outcome, now),
                None if after != before => {
                    self.events.push(Event::CountdownTick {
                        remaining_secs: after,
                    });
                }
                None => {}
            }
        }

        if self.state.schedule.take_due(now).is_some() {
            self.fire(now);
        }
    }

    /// Timer callback. Defers when a fullscreen surface is up, otherwise
    /// shows the break.
    pub fn fire(&mut self, now: Instant) {
        if !self.is_started() {
            warn!("break timer fired on a stopped controller");
            return;
        }
        self.state.schedule.cancel();

        if self.state.suppression.is_screen_locked {
            debug!("break timer fired while locked; ignoring");
            return;
        }
        if self.state.session.is_some() {
            warn!("break timer fired during an active break; ignoring");
            return;
        }
        if !self.policy.can_show_break_now(&self.host) {
            self.state.suppression.is_fullscreen_active = true;
            self.state.suppression.break_deferred = true;
            info!("fullscreen active; deferring break");
            self.events.push(Event::BreakDeferred { at: Utc::now() });
            return;
        }
        self.begin_break(now);
    }

    /// Show a break right away, ignoring fullscreen.
    pub fn trigger_now(&mut self, now: Instant) -> Result<()> {
        if !self.is_started() {
            return Err(CoreError::NotStarted);
        }
        if self.state.suppression.is_screen_locked {
            return Err(CoreError::ScreenLocked);
        }
        if self.state.session.is_some() {
            return Err(CoreError::SessionActive);
        }
        self.state.suppression.break_deferred = false;
        self.begin_break(now);
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn subscribe(&mut self) {
        for key in [BREAK_DURATION_KEY, COUNTDOWN_DURATION_KEY] {
            let id = self.settings.connect(key);
            self.state.subscriptions.push(Subscription::Settings(id));
        }
        for signal in [HostSignal::FullscreenChanged, HostSignal::ScreenLockChanged] {
            let id = self.host.connect(signal);
            self.state.subscriptions.push(Subscription::Host(id));
        }
    }

    fn begin_break(&mut self, now: Instant) {
        if self.state.session.is_some() {
            warn!("refusing to start a second break session");
            return;
        }
        self.state.schedule.cancel();
        self.state.break_generation += 1;
        let generation = self.state.break_generation;
        self.media.pause_and_remember(generation);

        let countdown = self.state.countdown_seconds;
        let mut session = OverlaySession::new(countdown, self.message.clone());
        match session.show(&mut self.host, now) {
            Ok(()) => {
                info!(generation, countdown, "break started");
                self.state.session = Some(session);
                self.events.push(Event::BreakStarted {
                    countdown_secs: countdown,
                    at: Utc::now(),
                });
            }
            Err(e) => {
                warn!(error = %e, "failed to show break overlay; rescheduling");
                self.events.push(Event::BreakFailed {
                    reason: e.to_string(),
                    at: Utc::now(),
                });
                let interval = self.state.schedule.interval();
                self.finish_break(interval, ScheduleReason::Failed, now);
            }
        }
    }

    fn complete(&mut self, outcome: BreakOutcome, now: Instant) {
        info!(?outcome, "break ended");
        self.events.push(Event::BreakEnded {
            outcome,
            at: Utc::now(),
        });
        match outcome {
            BreakOutcome::Snoozed => self.finish_break(SNOOZE_INTERVAL, ScheduleReason::Snoozed, now),
            _ => {
                let interval = self.state.schedule.interval();
                self.finish_break(interval, ScheduleReason::Completed, now);
            }
        }
    }

    fn finish_break(&mut self, delay: Duration, reason: ScheduleReason, now: Instant) {
        self.state.session = None;
        self.resume_media();
        if self.state.suppression.is_screen_locked {
            debug!("screen locked; timer re-arms on unlock");
            return;
        }
        self.arm(delay, reason, now);
    }

    fn resume_media(&mut self) {
        let resumed = self.media.resume_remembered();
        if !resumed.is_empty() {
            self.events.push(Event::MediaResumed { players: resumed });
        }
    }

    fn arm(&mut self, delay: Duration, reason: ScheduleReason, now: Instant) {
        let handle = self.state.schedule.arm(delay, now);
        debug!(
            generation = handle.generation(),
            in_secs = delay.as_secs(),
            ?reason,
            "break timer armed"
        );
        self.events.push(Event::BreakScheduled {
            in_secs: delay.as_secs(),
            reason,
            at: Utc::now(),
        });
    }
}
