use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::{session::SessionStatus, validation::validate_join_code},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Live session lookup, used by players before they join.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/sessions/{code}", get(session_status))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{code}",
    tag = "sessions",
    params(("code" = String, Path, description = "Six-digit join code")),
    responses(
        (status = 200, description = "Session status", body = SessionStatus),
        (status = 400, description = "Malformed join code"),
        (status = 404, description = "No live session for this code")
    )
)]
pub async fn session_status(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<SessionStatus>, AppError> {
    validate_join_code(&code)
        .map_err(|_| AppError::BadRequest(format!("invalid join code `{code}`")))?;
    let status = session_service::session_status(&state, &code).await?;
    Ok(Json(status))
}
