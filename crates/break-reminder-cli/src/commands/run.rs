//! Foreground daemon with a console host.
//!
//! The overlay is rendered as lines on stderr and user input comes from
//! stdin, one command per line. Events are printed to stdout as JSON lines.
//! The daemon keeps running after stdin closes; `quit`, SIGINT or SIGTERM
//! stop it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use break_reminder_core::error::HostError;
use break_reminder_core::host::GrabHandle;
use break_reminder_core::{
    BreakScheduler, Config, ConfigSettings, ConnectionTable, ControllerInput, ControllerOptions,
    Daemon, Event, Host, HostSignal, MediaBus, OverlayId, OverlayInput, OverlayView,
    SubscriptionId,
};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Args)]
pub struct RunArgs {
    /// Seconds between breaks (overrides config)
    #[arg(long)]
    pub interval: Option<u64>,
    /// Seconds the break overlay stays up (overrides config)
    #[arg(long)]
    pub countdown: Option<u32>,
    /// Control media through this playerctl executable instead of D-Bus
    #[arg(long)]
    pub playerctl: Option<String>,
}

/// Command-line values that win over the config file, including reloads.
#[derive(Debug, Clone, Copy, Default)]
struct Overrides {
    interval: Option<u64>,
    countdown: Option<u32>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(interval) = self.interval {
            config.break_duration = interval;
        }
        if let Some(countdown) = self.countdown {
            config.countdown_duration = countdown;
        }
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = Config::path()?;
    let mut config = Config::load()?;
    config
        .validate()
        .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
    let overrides = Overrides {
        interval: args.interval,
        countdown: args.countdown,
    };
    overrides.apply(&mut config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let bus = super::media_bus(args.playerctl);
    runtime.block_on(serve(path, config, overrides, bus));
    // The stdin reader sits in a blocking read; don't wait for it.
    runtime.shutdown_timeout(Duration::from_millis(100));
    Ok(())
}

async fn serve(path: PathBuf, config: Config, overrides: Overrides, bus: Arc<dyn MediaBus>) {
    let settings = ConfigSettings::new(config.clone());
    let host = ConsoleHost::new();
    let options = ControllerOptions::from(&config);

    let scheduler = BreakScheduler::new(host.clone(), settings.clone(), options);
    let (daemon, tx) = Daemon::new(scheduler, bus);

    tokio::spawn(read_commands(host.clone(), tx.clone()));
    tokio::spawn(watch_config(path, settings, overrides, tx.clone()));
    tokio::spawn(forward_signals(tx));

    daemon.run(print_event).await;
    info!("bye");
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to encode event"),
    }
}

async fn forward_signals(tx: UnboundedSender<ControllerInput>) {
    let Some(signal) = shutdown_signal().await else {
        warn!("signal handling unavailable; stop with `quit`");
        return;
    };
    info!(signal, "shutting down");
    if tx.send(ControllerInput::Shutdown).is_err() {
        debug!("daemon already stopped");
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Option<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            return tokio::signal::ctrl_c().await.ok().map(|()| "SIGINT");
        }
    };
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.ok().map(|()| "SIGINT"),
        _ = term.recv() => Some("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Option<&'static str> {
    tokio::signal::ctrl_c().await.ok().map(|()| "ctrl-c")
}

/// A parsed stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Input(ControllerInput),
    Lock(bool),
    Fullscreen(bool),
}

fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let arg = words.next();
    let parsed = match (command, arg) {
        ("close" | "esc" | "escape", None) => ConsoleCommand::Input(ControllerInput::Overlay {
            input: OverlayInput::CloseClicked,
        }),
        ("snooze", None) => ConsoleCommand::Input(ControllerInput::Overlay {
            input: OverlayInput::SnoozeClicked,
        }),
        ("break", None) => ConsoleCommand::Input(ControllerInput::TriggerNow),
        ("quit" | "exit", None) => ConsoleCommand::Input(ControllerInput::Shutdown),
        ("lock", None) => ConsoleCommand::Lock(true),
        ("unlock", None) => ConsoleCommand::Lock(false),
        ("fullscreen", Some("on")) => ConsoleCommand::Fullscreen(true),
        ("fullscreen", Some("off")) => ConsoleCommand::Fullscreen(false),
        ("", None) => return Err("empty command".to_string()),
        _ => return Err(format!("unknown command: {}", line.trim())),
    };
    if words.next().is_some() {
        return Err(format!("unexpected arguments: {}", line.trim()));
    }
    Ok(parsed)
}

async fn read_commands(host: ConsoleHost, tx: UnboundedSender<ControllerInput>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let input = match parse_command(&line) {
            Ok(ConsoleCommand::Input(input)) => Some(input),
            Ok(ConsoleCommand::Lock(locked)) => host
                .notifies(HostSignal::ScreenLockChanged)
                .then_some(ControllerInput::ScreenLockChanged { locked }),
            Ok(ConsoleCommand::Fullscreen(active)) => {
                host.set_fullscreen(active);
                host.notifies(HostSignal::FullscreenChanged)
                    .then_some(ControllerInput::FullscreenChanged { active })
            }
            Err(e) => {
                eprintln!("{e}");
                None
            }
        };
        if let Some(input) = input {
            if tx.send(input).is_err() {
                return;
            }
        }
    }
    info!("stdin closed; still running until quit or a signal");
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Poll the config file and publish changes for subscribed keys.
async fn watch_config(
    path: PathBuf,
    settings: ConfigSettings,
    overrides: Overrides,
    tx: UnboundedSender<ControllerInput>,
) {
    let mut last = modified_at(&path);
    let mut ticker = tokio::time::interval(CONFIG_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        if tx.is_closed() {
            return;
        }
        let current = modified_at(&path);
        if current == last {
            continue;
        }
        last = current;

        let mut config = match Config::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable config");
                continue;
            }
        };
        if let Err(e) = config.validate() {
            warn!(error = %e, "ignoring invalid config");
            continue;
        }
        overrides.apply(&mut config);

        let restart = settings.snapshot().restart_required(&config);
        if !restart.is_empty() {
            warn!(fields = ?restart, "config change takes effect after restart");
        }
        for key in settings.replace(config) {
            info!(key, "setting changed");
            if tx
                .send(ControllerInput::SettingChanged {
                    key: key.to_string(),
                })
                .is_err()
            {
                return;
            }
        }
    }
}

/// Host that draws the overlay as text on stderr.
#[derive(Debug, Clone, Default)]
struct ConsoleHost {
    fullscreen: Arc<AtomicBool>,
    signals: ConnectionTable<HostSignal>,
    next_id: u64,
}

impl ConsoleHost {
    fn new() -> Self {
        Self::default()
    }

    fn set_fullscreen(&self, active: bool) {
        self.fullscreen.store(active, Ordering::SeqCst);
    }

    /// Whether the controller currently listens for `signal`.
    fn notifies(&self, signal: HostSignal) -> bool {
        self.signals.is_connected(&signal)
    }

    fn render(view: &OverlayView) -> String {
        let message = view.message.replace('\n', " / ");
        format!(
            "{message}  ({}s)  [{}] [{}]",
            view.countdown, view.close_label, view.snooze_label
        )
    }
}

impl Host for ConsoleHost {
    fn is_any_output_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }

    fn add_fullscreen_overlay(&mut self, view: &OverlayView) -> Result<OverlayId, HostError> {
        self.next_id += 1;
        eprintln!("== BREAK == {}", Self::render(view));
        Ok(OverlayId(self.next_id))
    }

    fn update_overlay(&mut self, _id: OverlayId, view: &OverlayView) {
        eprintln!("   {}s left", view.countdown);
    }

    fn remove_overlay(&mut self, _id: OverlayId) {
        eprintln!("== break over ==");
    }

    fn push_input_grab(&mut self, id: OverlayId) -> Result<GrabHandle, HostError> {
        debug!(?id, "input grab: type close, esc or snooze");
        self.next_id += 1;
        Ok(GrabHandle(self.next_id))
    }

    fn pop_input_grab(&mut self, grab: GrabHandle) {
        debug!(?grab, "input grab released");
    }

    fn connect(&mut self, signal: HostSignal) -> SubscriptionId {
        self.signals.connect(signal)
    }

    fn disconnect(&mut self, id: SubscriptionId) {
        self.signals.disconnect(id);
    }
}
