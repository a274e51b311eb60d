//! Media controller: pause what is playing when a break starts, resume
//! exactly those players when it ends.
//!
//! The controller itself is synchronous. It queues [`MediaCommand`]s that
//! the daemon executes in order against a [`MediaBus`]; the enumeration
//! reply comes back tagged with the break generation that asked for it, so
//! a reply for a break that already ended can be recognised and dropped.

#[cfg(feature = "mpris")]
mod mpris_bus;
mod playerctl;

#[cfg(feature = "mpris")]
pub use mpris_bus::MprisBus;
pub use playerctl::PlayerctlBus;

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::MediaError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
    Other,
}

impl PlaybackStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Playing" => PlaybackStatus::Playing,
            "Paused" => PlaybackStatus::Paused,
            "Stopped" => PlaybackStatus::Stopped,
            _ => PlaybackStatus::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub player: PlayerId,
    pub status: PlaybackStatus,
}

impl PlayerStatus {
    pub fn new(player: impl Into<String>, status: PlaybackStatus) -> Self {
        Self {
            player: PlayerId::new(player),
            status,
        }
    }
}

/// How players get paused once their status is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseStrategy {
    /// One broadcast pause for every player on the bus.
    #[default]
    Broadcast,
    /// A pause command only to each player seen `Playing`.
    StatusAware,
}

/// What to do with an enumeration reply whose break already ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateReplyPolicy {
    /// Drop the reply entirely.
    #[default]
    Abandon,
    /// Record who was playing but issue no pause.
    RecordOnly,
}

/// Work for the media worker, executed strictly in queue order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MediaCommand {
    Enumerate { generation: u64 },
    PauseAll,
    Pause { player: PlayerId },
    Play { player: PlayerId },
}

/// MPRIS-style media control bus.
#[async_trait]
pub trait MediaBus: Send + Sync {
    async fn list_players(&self) -> Result<Vec<PlayerStatus>, MediaError>;

    async fn pause_all(&self) -> Result<(), MediaError>;

    async fn pause(&self, player: &PlayerId) -> Result<(), MediaError>;

    async fn play(&self, player: &PlayerId) -> Result<(), MediaError>;
}

/// Players that were playing when the current break started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPauseRecord {
    players: BTreeSet<PlayerId>,
}

impl MediaPauseRecord {
    pub fn contains(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.iter()
    }

    fn take(&mut self) -> Vec<PlayerId> {
        std::mem::take(&mut self.players).into_iter().collect()
    }
}

#[derive(Debug)]
pub struct MediaController {
    strategy: PauseStrategy,
    late_reply: LateReplyPolicy,
    record: MediaPauseRecord,
    /// Seen playing by a reply that arrived after its break ended. Never resumed.
    late: MediaPauseRecord,
    /// Generation whose enumeration reply is still outstanding.
    pending: Option<u64>,
    last_requested: Option<u64>,
    outbox: Vec<MediaCommand>,
}

impl Default for MediaController {
    fn default() -> Self {
        Self::new(PauseStrategy::default(), LateReplyPolicy::default())
    }
}

impl MediaController {
    pub fn new(strategy: PauseStrategy, late_reply: LateReplyPolicy) -> Self {
        Self {
            strategy,
            late_reply,
            record: MediaPauseRecord::default(),
            late: MediaPauseRecord::default(),
            pending: None,
            last_requested: None,
            outbox: Vec::new(),
        }
    }

    pub fn remembered(&self) -> &MediaPauseRecord {
        &self.record
    }

    /// Players reported by the last late reply under [`LateReplyPolicy::RecordOnly`].
    pub fn late_record(&self) -> &MediaPauseRecord {
        &self.late
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.pending.is_some()
    }

    /// Start the pause flow for break `generation`: clear the record and
    /// ask the bus who is playing.
    pub fn pause_and_remember(&mut self, generation: u64) {
        self.record = MediaPauseRecord::default();
        self.late = MediaPauseRecord::default();
        self.pending = Some(generation);
        self.last_requested = Some(generation);
        self.outbox.push(MediaCommand::Enumerate { generation });
    }

    /// Handle the enumeration reply. Returns the players a pause was issued for.
    pub fn on_status_reply(&mut self, generation: u64, statuses: Vec<PlayerStatus>) -> Vec<PlayerId> {
        let playing: BTreeSet<PlayerId> = statuses
            .into_iter()
            .filter(|s| s.status == PlaybackStatus::Playing)
            .map(|s| s.player)
            .collect();

        if self.pending != Some(generation) {
            let latest = self.last_requested == Some(generation) && self.pending.is_none();
            match self.late_reply {
                LateReplyPolicy::RecordOnly if latest => {
                    debug!(generation, players = playing.len(), "late media reply recorded without pausing");
                    self.late = MediaPauseRecord { players: playing };
                }
                _ => debug!(generation, "late media reply abandoned"),
            }
            return Vec::new();
        }

        self.pending = None;
        self.record = MediaPauseRecord { players: playing };
        if self.record.is_empty() {
            return Vec::new();
        }

        let paused: Vec<PlayerId> = self.record.iter().cloned().collect();
        match self.strategy {
            PauseStrategy::Broadcast => self.outbox.push(MediaCommand::PauseAll),
            PauseStrategy::StatusAware => {
                for player in &paused {
                    self.outbox.push(MediaCommand::Pause {
                        player: player.clone(),
                    });
                }
            }
        }
        info!(players = paused.len(), "pausing media for break");
        paused
    }

    /// Resume every remembered player, then forget them. No-op when empty.
    pub fn resume_remembered(&mut self) -> Vec<PlayerId> {
        self.pending = None;
        let players = self.record.take();
        for player in &players {
            self.outbox.push(MediaCommand::Play {
                player: player.clone(),
            });
        }
        if !players.is_empty() {
            info!(players = players.len(), "resuming media after break");
        }
        players
    }

    pub fn take_commands(&mut self) -> Vec<MediaCommand> {
        std::mem::take(&mut self.outbox)
    }
}
