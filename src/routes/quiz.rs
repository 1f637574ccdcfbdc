use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::quiz::{CreateQuizRequest, QuizDetail, QuizSummary},
    error::AppError,
    services::quiz_service,
    state::SharedState,
};

/// Quiz library endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/quiz", get(list_quizzes).post(create_quiz))
        .route("/api/quiz/{id}", get(get_quiz).delete(delete_quiz))
}

/// Store a new quiz.
#[utoipa::path(
    post,
    path = "/api/quiz",
    tag = "quiz",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Quiz stored", body = QuizDetail),
        (status = 400, description = "Invalid quiz"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_quiz(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateQuizRequest>>,
) -> Result<(StatusCode, Json<QuizDetail>), AppError> {
    let quiz = quiz_service::create_quiz(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// List stored quizzes, newest first.
#[utoipa::path(
    get,
    path = "/api/quiz",
    tag = "quiz",
    responses((status = 200, description = "Stored quizzes", body = [QuizSummary]))
)]
pub async fn list_quizzes(
    State(state): State<SharedState>,
) -> Result<Json<Vec<QuizSummary>>, AppError> {
    let quizzes = quiz_service::list_quizzes(&state).await?;
    Ok(Json(quizzes))
}

#[utoipa::path(
    get,
    path = "/api/quiz/{id}",
    tag = "quiz",
    params(("id" = String, Path, description = "Quiz identifier")),
    responses(
        (status = 200, description = "Quiz with its questions", body = QuizDetail),
        (status = 404, description = "Unknown quiz")
    )
)]
pub async fn get_quiz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizDetail>, AppError> {
    let quiz = quiz_service::get_quiz(&state, id).await?;
    Ok(Json(quiz))
}

#[utoipa::path(
    delete,
    path = "/api/quiz/{id}",
    tag = "quiz",
    params(("id" = String, Path, description = "Quiz identifier")),
    responses(
        (status = 204, description = "Quiz deleted"),
        (status = 404, description = "Unknown quiz")
    )
)]
pub async fn delete_quiz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    quiz_service::delete_quiz(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
