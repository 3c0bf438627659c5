use serde::Serialize;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: &'static str,
    /// Registered players.
    pub players: usize,
    /// Whether registration is open.
    pub registration_open: bool,
}

impl HealthResponse {
    /// Build the payload; `degraded` reflects the last persistence attempt.
    pub fn new(degraded: bool, players: usize, registration_open: bool) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" },
            players,
            registration_open,
        }
    }
}
