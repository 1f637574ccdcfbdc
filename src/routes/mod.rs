use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod history;
pub mod quiz;
pub mod sessions;
pub mod websocket;

/// Compose all route trees, wiring in shared state, documentation and middleware.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(websocket::router())
        .merge(quiz::router())
        .merge(history::router())
        .merge(sessions::router())
        .merge(docs::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
