//! Suppression policy: may a break be shown right now?
//!
//! Only fullscreen is gated here. A locked screen is handled by the
//! scheduler suspending its timer, since a lock should stop the wait
//! entirely rather than defer a single firing.

use serde::{Deserialize, Serialize};

use crate::host::Host;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionState {
    pub is_fullscreen_active: bool,
    pub is_screen_locked: bool,
    /// A break wanted to fire while suppressed and is waiting to be shown.
    pub break_deferred: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionPolicy {
    respect_fullscreen: bool,
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self {
            respect_fullscreen: true,
        }
    }
}

impl SuppressionPolicy {
    pub fn new(respect_fullscreen: bool) -> Self {
        Self { respect_fullscreen }
    }

    pub fn can_show_break_now<H: Host + ?Sized>(&self, host: &H) -> bool {
        !(self.respect_fullscreen && host.is_any_output_fullscreen())
    }
}
