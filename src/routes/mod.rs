use axum::Router;

use crate::state::SharedState;

/// `GET /healthcheck`.
pub mod health;
/// `GET /roster`.
pub mod roster;

/// Compose all route trees and wire in the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router().merge(roster::router()).with_state(state)
}
