use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{services::websocket_service, state::SharedState};

/// Largest inbound frame; a `create_game` with a long inline quiz stays well below it.
const MAX_FRAME_BYTES: usize = 256 * 1024;

#[utoipa::path(
    get,
    path = "/ws",
    tag = "live",
    responses((status = 101, description = "Switching protocols to the live quiz protocol"))
)]
/// Upgrade to the socket used by hosts and players alike; the role follows from the
/// first event sent (`create_game` or `join_game`).
pub async fn ws_handler(
    State(state): State<SharedState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| websocket_service::handle_socket(state, socket))
}

/// Live session socket.
pub fn router() -> Router<SharedState> {
    Router::new().route("/ws", get(ws_handler))
}
