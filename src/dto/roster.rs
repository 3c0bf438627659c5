use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::{RosterStatus, roster::Player};

/// Registered player as exposed over HTTP.
#[derive(Debug, Serialize)]
pub struct PlayerSummary {
    /// 1-based position in registration order.
    pub position: usize,
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Registration window as exposed over HTTP.
#[derive(Debug, Serialize)]
pub struct WindowSummary {
    pub open: bool,
    pub epoch: u64,
    pub reason: String,
    pub changed_at: Option<DateTime<Utc>>,
}

/// Response payload of `GET /roster`.
#[derive(Debug, Serialize)]
pub struct RosterStatusResponse {
    pub players: Vec<PlayerSummary>,
    pub capacity: usize,
    pub free_spots: usize,
    pub window: WindowSummary,
    /// Registration intents waiting for a yes/no.
    pub pending_confirmations: usize,
    pub organizer_question_armed: bool,
}

impl From<RosterStatus> for RosterStatusResponse {
    fn from(status: RosterStatus) -> Self {
        let free_spots = status.capacity.saturating_sub(status.players.len());
        let players = status
            .players
            .iter()
            .enumerate()
            .map(|(index, player)| PlayerSummary::new(index + 1, player))
            .collect();
        Self {
            players,
            capacity: status.capacity,
            free_spots,
            window: WindowSummary {
                open: status.window.is_open(),
                epoch: status.window.epoch(),
                reason: status.window.reason().to_string(),
                changed_at: status.window.changed_at(),
            },
            pending_confirmations: status.pending,
            organizer_question_armed: status.organizer_armed,
        }
    }
}

impl PlayerSummary {
    fn new(position: usize, player: &Player) -> Self {
        Self {
            position,
            id: player.id,
            name: player.display_name(),
            username: player.handle.clone(),
        }
    }
}
