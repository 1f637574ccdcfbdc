use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::history::{GameRecordDetail, GameRecordSummary},
    error::AppError,
    services::history_service,
    state::SharedState,
};

/// Read-only access to finished games.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/history", get(list_records))
        .route("/api/history/{id}", get(get_record))
}

/// List finished games, most recent first.
#[utoipa::path(
    get,
    path = "/api/history",
    tag = "history",
    responses((status = 200, description = "Finished games", body = [GameRecordSummary]))
)]
pub async fn list_records(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameRecordSummary>>, AppError> {
    let records = history_service::list_records(&state).await?;
    Ok(Json(records))
}

/// Full record of one finished game, including every answer.
#[utoipa::path(
    get,
    path = "/api/history/{id}",
    tag = "history",
    params(("id" = String, Path, description = "Game record identifier")),
    responses(
        (status = 200, description = "Game record", body = GameRecordDetail),
        (status = 404, description = "Unknown record")
    )
)]
pub async fn get_record(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameRecordDetail>, AppError> {
    let record = history_service::get_record(&state, id).await?;
    Ok(Json(record))
}
