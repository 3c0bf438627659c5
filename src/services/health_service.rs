use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Health payload reflecting persistence health and a roster summary.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let status = state.status().await;
    let degraded = state.is_degraded();
    if degraded {
        warn!("healthcheck served while persistence is failing (degraded mode)");
    }
    HealthResponse::new(degraded, status.players.len(), status.window.is_open())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::{
        state::{AppState, roster::Player},
        test_support::test_config,
        transport::recording::RecordingTransport,
    };

    #[tokio::test]
    async fn reports_degraded_after_failed_write() {
        let dir = TempDir::new().unwrap();
        let state = AppState::load(test_config(dir.path()), Arc::new(RecordingTransport::new()))
            .await
            .unwrap();
        assert_eq!(health_status(&state).await, HealthResponse::new(false, 0, true));

        std::fs::create_dir(dir.path().join("players.json")).unwrap();
        let player = Player {
            id: 1,
            first_name: "Anna".into(),
            last_name: None,
            handle: None,
        };
        assert!(state.register(player).await.is_err());

        assert_eq!(health_status(&state).await.status, "degraded");
    }
}
