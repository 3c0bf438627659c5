use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Player record as stored in `players.json`.
///
/// Field names match the historical file layout so existing rosters keep loading;
/// an absent last name is stored as an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Chat transport identifier of the player.
    pub user_id: i64,
    /// First name as reported by the transport.
    pub first_name: String,
    /// Last name, empty when the player has none.
    #[serde(default)]
    pub last_name: String,
    /// Platform handle, when the player has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Registration window state as stored in `window.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowEntity {
    /// Whether new registrations are accepted.
    pub open: bool,
    /// Monotonic counter incremented on every transition.
    pub epoch: u64,
    /// What caused the last transition.
    pub reason: String,
    /// When the last transition happened.
    #[serde(default)]
    pub changed_at: Option<DateTime<Utc>>,
}

/// Scheduler bookkeeping as stored in `triggers.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerLedgerEntity {
    /// Local wall-clock minute each trigger last fired for, keyed by trigger name.
    #[serde(default)]
    pub last_fired: BTreeMap<String, NaiveDateTime>,
}

/// Organizer question state as stored in `organizer.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizerPromptEntity {
    /// Whether the organizer still owes an answer.
    pub armed: bool,
    /// When the question was last asked.
    #[serde(default)]
    pub asked_at: Option<DateTime<Utc>>,
}
