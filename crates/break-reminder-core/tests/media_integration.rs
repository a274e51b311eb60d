//! Integration tests for the media side: the sequential worker and the
//! `playerctl` bus.

mod support;

use std::sync::Arc;

use break_reminder_core::daemon::media_worker;
use break_reminder_core::error::MediaError;
use break_reminder_core::media::{
    MediaBus, MediaCommand, PlaybackStatus, PlayerId, PlayerStatus, PlayerctlBus,
};
use break_reminder_core::scheduler::ControllerInput;
use support::FakeBus;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_worker_runs_commands_in_order() {
    let bus = FakeBus::with_players(&[
        ("spotify", PlaybackStatus::Playing),
        ("vlc", PlaybackStatus::Paused),
    ]);
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(media_worker(Arc::new(bus.clone()), cmd_rx, reply_tx.downgrade()));

    cmd_tx.send(MediaCommand::Enumerate { generation: 7 }).unwrap();
    cmd_tx.send(MediaCommand::PauseAll).unwrap();
    cmd_tx
        .send(MediaCommand::Play {
            player: PlayerId::new("spotify"),
        })
        .unwrap();
    drop(cmd_tx);
    worker.await.unwrap();

    assert_eq!(bus.calls(), vec!["list", "pause_all", "play spotify"]);
    assert_eq!(bus.status_of("spotify"), Some(PlaybackStatus::Playing));
    assert_eq!(bus.status_of("vlc"), Some(PlaybackStatus::Paused));

    let reply = reply_rx.recv().await.unwrap();
    assert_eq!(
        reply,
        ControllerInput::MediaStatus {
            generation: 7,
            players: vec![
                PlayerStatus::new("spotify", PlaybackStatus::Playing),
                PlayerStatus::new("vlc", PlaybackStatus::Paused),
            ],
        }
    );
}

#[tokio::test]
async fn test_failed_enumeration_replies_with_no_players() {
    let bus = FakeBus::default();
    bus.log.lock().unwrap().fail_list = true;
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(media_worker(Arc::new(bus), cmd_rx, reply_tx.downgrade()));

    cmd_tx.send(MediaCommand::Enumerate { generation: 1 }).unwrap();
    drop(cmd_tx);
    worker.await.unwrap();

    assert_eq!(
        reply_rx.recv().await,
        Some(ControllerInput::MediaStatus {
            generation: 1,
            players: Vec::new(),
        })
    );
}

#[tokio::test]
async fn test_vanished_player_does_not_stop_other_resumes() {
    let bus = FakeBus::with_players(&[("spotify", PlaybackStatus::Paused)]);
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (reply_tx, _reply_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(media_worker(Arc::new(bus.clone()), cmd_rx, reply_tx.downgrade()));

    // mpv quit during the break
    for name in ["mpv", "spotify"] {
        cmd_tx
            .send(MediaCommand::Play {
                player: PlayerId::new(name),
            })
            .unwrap();
    }
    drop(cmd_tx);
    worker.await.unwrap();

    assert_eq!(bus.calls(), vec!["play mpv", "play spotify"]);
    assert_eq!(bus.status_of("spotify"), Some(PlaybackStatus::Playing));
    assert!(matches!(
        bus.play(&PlayerId::new("mpv")).await,
        Err(MediaError::PlayerNotFound(name)) if name == "mpv"
    ));
}

#[tokio::test]
async fn test_worker_survives_a_closed_reply_channel() {
    let bus = FakeBus::with_players(&[("mpv", PlaybackStatus::Playing)]);
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    drop(reply_rx);
    let worker = tokio::spawn(media_worker(Arc::new(bus.clone()), cmd_rx, reply_tx.downgrade()));

    cmd_tx.send(MediaCommand::Enumerate { generation: 1 }).unwrap();
    cmd_tx
        .send(MediaCommand::Pause {
            player: PlayerId::new("mpv"),
        })
        .unwrap();
    drop(cmd_tx);
    worker.await.unwrap();

    assert_eq!(bus.calls(), vec!["list", "pause mpv"]);
}

#[cfg(unix)]
mod playerctl {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use break_reminder_core::error::MediaError;

    use super::*;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    // One test so no other test thread forks while a script is open for writing.
    #[tokio::test]
    async fn test_playerctl_bus_against_fake_binary() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");

        let ok = script(
            dir.path(),
            "playerctl-ok",
            &format!(
                "echo \"$@\" >> '{}'\nif [ \"$2\" = metadata ]; then printf 'spotify:Playing\\nvlc:Paused\\nspotify:Paused\\n'; fi",
                log.display()
            ),
        );
        let bus = PlayerctlBus::new(ok.to_string_lossy());
        let players = bus.list_players().await.unwrap();
        assert_eq!(
            players,
            vec![
                PlayerStatus::new("spotify", PlaybackStatus::Playing),
                PlayerStatus::new("vlc", PlaybackStatus::Paused),
            ]
        );
        bus.pause_all().await.unwrap();
        bus.pause(&PlayerId::new("vlc")).await.unwrap();
        bus.play(&PlayerId::new("spotify")).await.unwrap();

        let calls = fs::read_to_string(&log).unwrap();
        assert_eq!(
            calls.lines().collect::<Vec<_>>(),
            vec![
                "-a metadata --format {{playerName}}:{{status}}",
                "-a pause",
                "-p vlc pause",
                "-p spotify play",
            ]
        );

        let empty = script(
            dir.path(),
            "playerctl-empty",
            "echo 'No players found' >&2\nexit 1",
        );
        let bus = PlayerctlBus::new(empty.to_string_lossy());
        assert!(bus.list_players().await.unwrap().is_empty());

        let broken = script(dir.path(), "playerctl-broken", "echo 'bus error' >&2\nexit 2");
        let bus = PlayerctlBus::new(broken.to_string_lossy());
        let err = bus.play(&PlayerId::new("mpv")).await.unwrap_err();
        match err {
            MediaError::CommandFailed { command, stderr, .. } => {
                assert!(command.ends_with("-p mpv play"));
                assert_eq!(stderr, "bus error");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
