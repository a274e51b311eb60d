//! Async driver for [`BreakScheduler`].
//!
//! One loop owns the scheduler: it forwards [`ControllerInput`]s, sleeps
//! until the next deadline and ticks. Media commands go to a worker task
//! that runs them one at a time against the [`MediaBus`] and posts
//! enumeration replies back to the loop.

use std::future::pending;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::events::Event;
use crate::host::Host;
use crate::media::{MediaBus, MediaCommand};
use crate::scheduler::{BreakScheduler, ControllerInput};
use crate::settings::SettingsProvider;

pub struct Daemon<H, S> {
    scheduler: BreakScheduler<H, S>,
    bus: Arc<dyn MediaBus>,
    inputs: UnboundedReceiver<ControllerInput>,
    replies: WeakUnboundedSender<ControllerInput>,
}

impl<H: Host, S: SettingsProvider> Daemon<H, S> {
    /// Returns the daemon and the sender its inputs arrive on.
    pub fn new(
        scheduler: BreakScheduler<H, S>,
        bus: Arc<dyn MediaBus>,
    ) -> (Self, UnboundedSender<ControllerInput>) {
        let (tx, inputs) = mpsc::unbounded_channel();
        let daemon = Self {
            scheduler,
            bus,
            inputs,
            replies: tx.downgrade(),
        };
        (daemon, tx)
    }

    /// Run until [`ControllerInput::Shutdown`] arrives or every sender is
    /// dropped. The scheduler is stopped and handed back.
    pub async fn run<F>(self, mut on_event: F) -> BreakScheduler<H, S>
    where
        F: FnMut(&Event),
    {
        let Self {
            mut scheduler,
            bus,
            mut inputs,
            replies,
        } = self;

        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(media_worker(bus, media_rx, replies));

        scheduler.start(Instant::now());
        flush(&mut scheduler, &media_tx, &mut on_event);

        loop {
            let deadline = scheduler.next_deadline();
            tokio::select! {
                input = inputs.recv() => {
                    match input {
                        None | Some(ControllerInput::Shutdown) => break,
                        Some(input) => {
                            debug!(?input, "controller input");
                            scheduler.handle(input, Instant::now());
                        }
                    }
                }
                _ = sleep_or_park(deadline) => {}
            }
            scheduler.tick(Instant::now());
            flush(&mut scheduler, &media_tx, &mut on_event);
        }

        info!("shutting down break controller");
        scheduler.stop();
        flush(&mut scheduler, &media_tx, &mut on_event);

        drop(media_tx);
        if let Err(e) = worker.await {
            warn!(error = %e, "media worker ended abnormally");
        }
        scheduler
    }
}

async fn sleep_or_park(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}

fn flush<H, S, F>(
    scheduler: &mut BreakScheduler<H, S>,
    media_tx: &UnboundedSender<MediaCommand>,
    on_event: &mut F,
) where
    H: Host,
    S: SettingsProvider,
    F: FnMut(&Event),
{
    for event in scheduler.take_events() {
        on_event(&event);
    }
    for command in scheduler.take_media_commands() {
        if media_tx.send(command).is_err() {
            warn!("media worker gone; dropping command");
        }
    }
}

/// Executes media commands strictly in order. Failures are logged and
/// never stop the worker.
///
/// Replies go through a weak sender so the worker never keeps the
/// controller's input channel open by itself.
pub async fn media_worker(
    bus: Arc<dyn MediaBus>,
    mut commands: UnboundedReceiver<MediaCommand>,
    replies: WeakUnboundedSender<ControllerInput>,
) {
    while let Some(command) = commands.recv().await {
        let result = match &command {
            MediaCommand::Enumerate { generation } => {
                let players = bus.list_players().await.unwrap_or_else(|e| {
                    warn!(error = %e, "media enumeration failed; treating as no players");
                    Vec::new()
                });
                let reply = ControllerInput::MediaStatus {
                    generation: *generation,
                    players,
                };
                let delivered = replies
                    .upgrade()
                    .is_some_and(|tx| tx.send(reply).is_ok());
                if !delivered {
                    debug!(generation, "controller gone; dropping media reply");
                }
                Ok(())
            }
            MediaCommand::PauseAll => bus.pause_all().await,
            MediaCommand::Pause { player } => bus.pause(player).await,
            MediaCommand::Play { player } => bus.play(player).await,
        };
        if let Err(e) = result {
            warn!(?command, error = %e, "media command failed");
        }
    }
    debug!("media worker finished");
}
