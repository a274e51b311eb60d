//! Windowing/compositor host interface.
//!
//! The core never draws anything itself. It hands an [`OverlayView`] to the
//! host, asks for a modal input grab, and queries whether any output is
//! currently fullscreen.

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::subscription::SubscriptionId;

pub const CLOSE_LABEL: &str = "End Break";
pub const SNOOZE_LABEL: &str = "Stop for 1 hour";
pub const DEFAULT_MESSAGE: &str = "Take a Break for Your Eyes and Back!\nTake a deep breath.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OverlayId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GrabHandle(pub u64);

/// Host notifications the controller can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostSignal {
    FullscreenChanged,
    ScreenLockChanged,
}

/// Everything the host needs to render one break overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayView {
    pub message: String,
    pub countdown: u32,
    pub close_label: String,
    pub snooze_label: String,
}

impl OverlayView {
    pub fn new(message: impl Into<String>, countdown: u32) -> Self {
        Self {
            message: message.into(),
            countdown,
            close_label: CLOSE_LABEL.to_string(),
            snooze_label: SNOOZE_LABEL.to_string(),
        }
    }
}

pub trait Host {
    /// True when any monitored output shows a fullscreen surface.
    fn is_any_output_fullscreen(&self) -> bool;

    fn add_fullscreen_overlay(&mut self, view: &OverlayView) -> Result<OverlayId, HostError>;

    /// Refresh an overlay already on screen (countdown label).
    fn update_overlay(&mut self, id: OverlayId, view: &OverlayView);

    fn remove_overlay(&mut self, id: OverlayId);

    fn push_input_grab(&mut self, id: OverlayId) -> Result<GrabHandle, HostError>;

    fn pop_input_grab(&mut self, grab: GrabHandle);

    fn connect(&mut self, signal: HostSignal) -> SubscriptionId;

    fn disconnect(&mut self, id: SubscriptionId);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::subscription::ConnectionTable;

    /// In-memory host that records every call.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingHost {
        pub fullscreen: bool,
        pub fail_overlay: bool,
        pub fail_grab: bool,
        pub overlays: Vec<(OverlayId, OverlayView)>,
        pub grabs: Vec<GrabHandle>,
        pub removed: Vec<OverlayId>,
        pub popped: Vec<GrabHandle>,
        pub signals: ConnectionTable<HostSignal>,
        next_id: u64,
    }

    impl RecordingHost {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn visible(&self) -> usize {
            self.overlays.len()
        }

        pub fn held_grabs(&self) -> usize {
            self.grabs.len()
        }

        pub fn countdown_shown(&self) -> Option<u32> {
            self.overlays.last().map(|(_, view)| view.countdown)
        }
    }

    impl Host for RecordingHost {
        fn is_any_output_fullscreen(&self) -> bool {
            self.fullscreen
        }

        fn add_fullscreen_overlay(&mut self, view: &OverlayView) -> Result<OverlayId, HostError> {
            if self.fail_overlay {
                return Err(HostError::OverlayRejected("no primary monitor".into()));
            }
            self.next_id += 1;
            let id = OverlayId(self.next_id);
            self.overlays.push((id, view.clone()));
            Ok(id)
        }

        fn update_overlay(&mut self, id: OverlayId, view: &OverlayView) {
            if let Some(entry) = self.overlays.iter_mut().find(|(o, _)| *o == id) {
                entry.1 = view.clone();
            }
        }

        fn remove_overlay(&mut self, id: OverlayId) {
            self.overlays.retain(|(o, _)| *o != id);
            self.removed.push(id);
        }

        fn push_input_grab(&mut self, _id: OverlayId) -> Result<GrabHandle, HostError> {
            if self.fail_grab {
                return Err(HostError::GrabFailed("another modal is active".into()));
            }
            self.next_id += 1;
            let grab = GrabHandle(self.next_id);
            self.grabs.push(grab);
            Ok(grab)
        }

        fn pop_input_grab(&mut self, grab: GrabHandle) {
            self.grabs.retain(|g| *g != grab);
            self.popped.push(grab);
        }

        fn connect(&mut self, signal: HostSignal) -> SubscriptionId {
            self.signals.connect(signal)
        }

        fn disconnect(&mut self, id: SubscriptionId) {
            self.signals.disconnect(id);
        }
    }
}
