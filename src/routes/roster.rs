use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::roster::RosterStatusResponse, state::SharedState};

/// Read-only view of the roster, the registration window and pending prompts.
pub fn router() -> Router<SharedState> {
    Router::new().route("/roster", get(get_roster))
}

/// Return the registered players in order together with the window state.
pub async fn get_roster(State(state): State<SharedState>) -> Json<RosterStatusResponse> {
    Json(state.status().await.into())
}
