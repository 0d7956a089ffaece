//! Primary-instance notification with a periodic heartbeat.

/// Longest interval between primary notifications (µs).
pub const PRIMARY_REFRESH_US: u64 = 200_000;

/// What the backend was last told about its primary status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PrimaryState {
    #[default]
    Unnotified,
    Notified { is_primary: bool, at_us: u64 },
}

/// Decouples "is logically primary" from "has been told".
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimarySelector {
    state: PrimaryState,
}

impl PrimarySelector {
    pub const fn new() -> Self {
        Self {
            state: PrimaryState::Unnotified,
        }
    }

    pub fn state(&self) -> PrimaryState {
        self.state
    }

    /// Returns the status to notify, if a notification is due: on the
    /// first call, on a change, or once [`PRIMARY_REFRESH_US`] has passed
    /// since the previous notification.
    pub fn reconcile(&mut self, is_primary: bool, now_us: u64) -> Option<bool> {
        let due = match self.state {
            PrimaryState::Unnotified => true,
            PrimaryState::Notified { is_primary: was, at_us } => {
                was != is_primary || now_us.saturating_sub(at_us) >= PRIMARY_REFRESH_US
            }
        };
        if !due {
            return None;
        }
        self.state = PrimaryState::Notified {
            is_primary,
            at_us: now_us,
        };
        Some(is_primary)
    }
}
