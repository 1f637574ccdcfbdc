use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the store and report the degraded flag with the number of live sessions.
///
/// A failed probe is only logged; the storage supervisor owns the degraded flag.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.game_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("no storage backend installed (degraded mode)"),
    }

    HealthResponse::new(state.is_degraded(), state.registry().len())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::memory::InMemoryGameStore,
        state::{AppState, session::GameSession},
    };

    #[tokio::test]
    async fn reports_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await, HealthResponse::new(true, 0));

        state
            .install_game_store(Arc::new(InMemoryGameStore::new()))
            .await;
        state
            .registry()
            .create(|pin| GameSession::new(pin, "Quiz".into(), None, Vec::new(), Uuid::new_v4()))
            .unwrap();

        let status = health_status(&state).await;
        assert_eq!(status.status, "ok");
        assert_eq!(status.live_sessions, 1);
    }
}
