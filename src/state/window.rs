use chrono::{DateTime, Utc};

use crate::dao::models::WindowEntity;

/// Reason recorded when no transition has happened yet.
pub const INITIAL_REASON: &str = "initial";

/// Gate deciding whether new registration intents are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationWindow {
    open: bool,
    epoch: u64,
    reason: String,
    changed_at: Option<DateTime<Utc>>,
}

impl Default for RegistrationWindow {
    fn default() -> Self {
        Self {
            open: true,
            epoch: 0,
            reason: INITIAL_REASON.to_string(),
            changed_at: None,
        }
    }
}

impl RegistrationWindow {
    /// Whether registrations are accepted.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of transitions since the window was first created.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Why the window last changed.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// When the window last changed, if ever.
    pub fn changed_at(&self) -> Option<DateTime<Utc>> {
        self.changed_at
    }

    /// Return the window after setting it to `open`.
    ///
    /// Every call counts as a transition, including one that leaves the flag
    /// unchanged, so the recorded reason always names the latest decision.
    pub fn transitioned(&self, open: bool, reason: &str, at: DateTime<Utc>) -> Self {
        Self {
            open,
            epoch: self.epoch + 1,
            reason: reason.to_string(),
            changed_at: Some(at),
        }
    }
}

impl From<WindowEntity> for RegistrationWindow {
    fn from(value: WindowEntity) -> Self {
        Self {
            open: value.open,
            epoch: value.epoch,
            reason: value.reason,
            changed_at: value.changed_at,
        }
    }
}

impl From<&RegistrationWindow> for WindowEntity {
    fn from(value: &RegistrationWindow) -> Self {
        Self {
            open: value.open,
            epoch: value.epoch,
            reason: value.reason.clone(),
            changed_at: value.changed_at,
        }
    }
}
