//! [`MediaBus`] speaking MPRIS directly over the D-Bus session bus.
//!
//! `mpris` handles are not `Send`, so every call opens its own finder on a
//! blocking thread and only plain data crosses back.

use async_trait::async_trait;
use mpris::{Player, PlayerFinder};
use tracing::{debug, warn};

use super::{MediaBus, PlaybackStatus, PlayerId, PlayerStatus};
use crate::error::MediaError;

const BUS_NAME_PREFIX: &str = "org.mpris.MediaPlayer2.";

#[derive(Debug, Clone, Copy, Default)]
pub struct MprisBus;

impl MprisBus {
    pub fn new() -> Self {
        Self
    }
}

/// `org.mpris.MediaPlayer2.spotify` -> `spotify`, the name playerctl shows.
pub(crate) fn player_id_from_bus_name(bus_name: &str) -> PlayerId {
    PlayerId::new(bus_name.strip_prefix(BUS_NAME_PREFIX).unwrap_or(bus_name))
}

fn status_from(status: mpris::PlaybackStatus) -> PlaybackStatus {
    match status {
        mpris::PlaybackStatus::Playing => PlaybackStatus::Playing,
        mpris::PlaybackStatus::Paused => PlaybackStatus::Paused,
        mpris::PlaybackStatus::Stopped => PlaybackStatus::Stopped,
    }
}

fn find_all() -> Result<Vec<Player>, MediaError> {
    let finder = PlayerFinder::new().map_err(|e| MediaError::Bus(e.to_string()))?;
    finder.find_all().map_err(|e| MediaError::Bus(e.to_string()))
}

/// Run `action` on every player named `target`.
fn with_player<F>(target: &PlayerId, action: F) -> Result<(), MediaError>
where
    F: Fn(&Player) -> Result<(), mpris::DBusError>,
{
    let mut found = false;
    for player in find_all()? {
        if player_id_from_bus_name(player.bus_name()) != *target {
            continue;
        }
        found = true;
        action(&player).map_err(|e| MediaError::Bus(e.to_string()))?;
    }
    if found {
        Ok(())
    } else {
        Err(MediaError::PlayerNotFound(target.to_string()))
    }
}

async fn blocking<T, F>(call: F) -> Result<T, MediaError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, MediaError> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| MediaError::Bus(e.to_string()))?
}

#[async_trait]
impl MediaBus for MprisBus {
    async fn list_players(&self) -> Result<Vec<PlayerStatus>, MediaError> {
        blocking(|| {
            let mut statuses: Vec<PlayerStatus> = Vec::new();
            for player in find_all()? {
                let id = player_id_from_bus_name(player.bus_name());
                let status = match player.get_playback_status() {
                    Ok(status) => status_from(status),
                    Err(e) => {
                        debug!(player = %id, error = %e, "playback status unavailable");
                        PlaybackStatus::Other
                    }
                };
                match statuses.iter_mut().find(|s| s.player == id) {
                    Some(existing) if status == PlaybackStatus::Playing => existing.status = status,
                    Some(_) => {}
                    None => statuses.push(PlayerStatus { player: id, status }),
                }
            }
            Ok(statuses)
        })
        .await
    }

    async fn pause_all(&self) -> Result<(), MediaError> {
        blocking(|| {
            for player in find_all()? {
                if let Err(e) = player.pause() {
                    warn!(player = player.bus_name(), error = %e, "pause failed");
                }
            }
            Ok(())
        })
        .await
    }

    async fn pause(&self, player: &PlayerId) -> Result<(), MediaError> {
        let target = player.clone();
        blocking(move || with_player(&target, Player::pause)).await
    }

    async fn play(&self, player: &PlayerId) -> Result<(), MediaError> {
        let target = player.clone();
        blocking(move || with_player(&target, Player::play)).await
    }
}
