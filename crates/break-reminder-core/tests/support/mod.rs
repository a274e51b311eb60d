//! Shared fakes for the integration tests.
//!
//! Both fakes keep their state behind an `Arc<Mutex<_>>` so a test can keep
//! a handle after moving the fake into a scheduler or daemon.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use break_reminder_core::error::{HostError, MediaError};
use break_reminder_core::host::{GrabHandle, Host, HostSignal, OverlayId, OverlayView};
use break_reminder_core::media::{MediaBus, PlaybackStatus, PlayerId, PlayerStatus};
use break_reminder_core::subscription::{ConnectionTable, SubscriptionId};

#[derive(Debug, Default)]
pub struct HostLog {
    pub fullscreen: bool,
    pub fail_overlay: bool,
    pub overlays: Vec<(OverlayId, OverlayView)>,
    pub grabs: Vec<GrabHandle>,
    pub shown_total: usize,
    pub signals: ConnectionTable<HostSignal>,
    next_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    pub log: Arc<Mutex<HostLog>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fullscreen(&self, on: bool) {
        self.log.lock().unwrap().fullscreen = on;
    }

    pub fn fail_overlays(&self, fail: bool) {
        self.log.lock().unwrap().fail_overlay = fail;
    }

    pub fn visible(&self) -> usize {
        self.log.lock().unwrap().overlays.len()
    }

    pub fn held_grabs(&self) -> usize {
        self.log.lock().unwrap().grabs.len()
    }

    pub fn shown_total(&self) -> usize {
        self.log.lock().unwrap().shown_total
    }

    pub fn countdown_shown(&self) -> Option<u32> {
        self.log
            .lock()
            .unwrap()
            .overlays
            .last()
            .map(|(_, view)| view.countdown)
    }

    pub fn last_view(&self) -> Option<OverlayView> {
        self.log
            .lock()
            .unwrap()
            .overlays
            .last()
            .map(|(_, view)| view.clone())
    }

    pub fn subscriptions(&self) -> usize {
        self.log.lock().unwrap().signals.len()
    }
}

impl Host for FakeHost {
    fn is_any_output_fullscreen(&self) -> bool {
        self.log.lock().unwrap().fullscreen
    }

    fn add_fullscreen_overlay(&mut self, view: &OverlayView) -> Result<OverlayId, HostError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_overlay {
            return Err(HostError::OverlayRejected("no primary monitor".into()));
        }
        log.next_id += 1;
        let id = OverlayId(log.next_id);
        log.overlays.push((id, view.clone()));
        log.shown_total += 1;
        Ok(id)
    }

    fn update_overlay(&mut self, id: OverlayId, view: &OverlayView) {
        let mut log = self.log.lock().unwrap();
        if let Some(entry) = log.overlays.iter_mut().find(|(o, _)| *o == id) {
            entry.1 = view.clone();
        }
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        self.log.lock().unwrap().overlays.retain(|(o, _)| *o != id);
    }

    fn push_input_grab(&mut self, _id: OverlayId) -> Result<GrabHandle, HostError> {
        let mut log = self.log.lock().unwrap();
        log.next_id += 1;
        let grab = GrabHandle(log.next_id);
        log.grabs.push(grab);
        Ok(grab)
    }

    fn pop_input_grab(&mut self, grab: GrabHandle) {
        self.log.lock().unwrap().grabs.retain(|g| *g != grab);
    }

    fn connect(&mut self, signal: HostSignal) -> SubscriptionId {
        self.log.lock().unwrap().signals.connect(signal)
    }

    fn disconnect(&mut self, id: SubscriptionId) {
        self.log.lock().unwrap().signals.disconnect(id);
    }
}

#[derive(Debug, Default)]
pub struct BusLog {
    pub players: Vec<PlayerStatus>,
    pub fail_list: bool,
    pub calls: Vec<String>,
}

/// In-memory media bus. Pausing a player flips its status so a later
/// enumeration sees it paused.
#[derive(Debug, Clone, Default)]
pub struct FakeBus {
    pub log: Arc<Mutex<BusLog>>,
}

impl FakeBus {
    pub fn with_players(players: &[(&str, PlaybackStatus)]) -> Self {
        let bus = Self::default();
        bus.log.lock().unwrap().players = players
            .iter()
            .map(|(name, status)| PlayerStatus::new(*name, *status))
            .collect();
        bus
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn status_of(&self, name: &str) -> Option<PlaybackStatus> {
        self.log
            .lock()
            .unwrap()
            .players
            .iter()
            .find(|p| p.player.as_str() == name)
            .map(|p| p.status)
    }

    fn set_status(&self, player: Option<&PlayerId>, from: PlaybackStatus, to: PlaybackStatus) {
        let mut log = self.log.lock().unwrap();
        for p in log.players.iter_mut() {
            if player.map_or(true, |id| *id == p.player) && p.status == from {
                p.status = to;
            }
        }
    }

    fn require(&self, player: &PlayerId) -> Result<(), MediaError> {
        let log = self.log.lock().unwrap();
        if log.players.iter().any(|p| p.player == *player) {
            Ok(())
        } else {
            Err(MediaError::PlayerNotFound(player.to_string()))
        }
    }
}

#[async_trait]
impl MediaBus for FakeBus {
    async fn list_players(&self) -> Result<Vec<PlayerStatus>, MediaError> {
        let mut log = self.log.lock().unwrap();
        log.calls.push("list".to_string());
        if log.fail_list {
            return Err(MediaError::CommandFailed {
                command: "list".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "bus unavailable".to_string(),
            });
        }
        Ok(log.players.clone())
    }

    async fn pause_all(&self) -> Result<(), MediaError> {
        self.log.lock().unwrap().calls.push("pause_all".to_string());
        self.set_status(None, PlaybackStatus::Playing, PlaybackStatus::Paused);
        Ok(())
    }

    async fn pause(&self, player: &PlayerId) -> Result<(), MediaError> {
        self.log.lock().unwrap().calls.push(format!("pause {player}"));
        self.require(player)?;
        self.set_status(Some(player), PlaybackStatus::Playing, PlaybackStatus::Paused);
        Ok(())
    }

    async fn play(&self, player: &PlayerId) -> Result<(), MediaError> {
        self.log.lock().unwrap().calls.push(format!("play {player}"));
        self.require(player)?;
        self.set_status(Some(player), PlaybackStatus::Paused, PlaybackStatus::Playing);
        Ok(())
    }
}
