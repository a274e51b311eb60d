pub mod config;
pub mod players;
pub mod run;

use std::sync::Arc;

use break_reminder_core::{MediaBus, MprisBus, PlayerctlBus};

/// MPRIS over D-Bus unless a playerctl executable was asked for.
pub fn media_bus(playerctl: Option<String>) -> Arc<dyn MediaBus> {
    match playerctl {
        Some(program) => Arc::new(PlayerctlBus::new(program)),
        None => Arc::new(MprisBus::new()),
    }
}
