//! [`MediaBus`] backed by the `playerctl` command line client.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{MediaBus, PlaybackStatus, PlayerId, PlayerStatus};
use crate::error::MediaError;

const STATUS_FORMAT: &str = "{{playerName}}:{{status}}";

#[derive(Debug, Clone)]
pub struct PlayerctlBus {
    program: String,
}

impl Default for PlayerctlBus {
    fn default() -> Self {
        Self::new("playerctl")
    }
}

impl PlayerctlBus {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, MediaError> {
        debug!(program = %self.program, ?args, "media bus call");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|source| MediaError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        // playerctl exits non-zero when the bus simply has no players.
        if stderr.contains("No players found") {
            return Ok(String::new());
        }
        Err(MediaError::CommandFailed {
            command: format!("{} {}", self.program, args.join(" ")),
            status: output.status.to_string(),
            stderr,
        })
    }
}

/// Parse `playerctl -a metadata --format {{playerName}}:{{status}}` output.
pub(crate) fn parse_status_lines(stdout: &str) -> Vec<PlayerStatus> {
    let mut players: Vec<PlayerStatus> = Vec::new();
    for line in stdout.lines() {
        let Some((name, status)) = line.trim().split_once(':') else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let entry = PlayerStatus {
            player: PlayerId::new(name),
            status: PlaybackStatus::parse(status),
        };
        // Several instances can share a name; one playing instance wins.
        match players.iter_mut().find(|p| p.player == entry.player) {
            Some(existing) if entry.status == PlaybackStatus::Playing => existing.status = entry.status,
            Some(_) => {}
            None => players.push(entry),
        }
    }
    players
}

#[async_trait]
impl MediaBus for PlayerctlBus {
    async fn list_players(&self) -> Result<Vec<PlayerStatus>, MediaError> {
        let stdout = self.run(&["-a", "metadata", "--format", STATUS_FORMAT]).await?;
        Ok(parse_status_lines(&stdout))
    }

    async fn pause_all(&self) -> Result<(), MediaError> {
        self.run(&["-a", "pause"]).await.map(|_| ())
    }

    async fn pause(&self, player: &PlayerId) -> Result<(), MediaError> {
        self.run(&["-p", player.as_str(), "pause"]).await.map(|_| ())
    }

    async fn play(&self, player: &PlayerId) -> Result<(), MediaError> {
        self.run(&["-p", player.as_str(), "play"]).await.map(|_| ())
    }
}
