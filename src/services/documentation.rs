use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI document of the REST routes and the WebSocket payloads.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::quiz::create_quiz,
        crate::routes::quiz::list_quizzes,
        crate::routes::quiz::get_quiz,
        crate::routes::quiz::delete_quiz,
        crate::routes::history::list_records,
        crate::routes::history::get_record,
        crate::routes::sessions::session_status,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::quiz::CreateQuizRequest,
            crate::dto::quiz::QuestionInput,
            crate::dto::quiz::QuestionView,
            crate::dto::quiz::QuizSummary,
            crate::dto::quiz::QuizDetail,
            crate::dto::history::GameRecordSummary,
            crate::dto::history::GameRecordDetail,
            crate::dto::history::QuestionDetailView,
            crate::dto::history::PlayerAnswerView,
            crate::dto::history::FinalScoreView,
            crate::dto::session::SessionStatus,
            crate::dto::session::VisibleSessionPhase,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::CreateGamePayload,
            crate::dto::ws::PinPayload,
            crate::dto::ws::JoinGamePayload,
            crate::dto::ws::SubmitAnswerPayload,
            crate::dto::ws::GameCreated,
            crate::dto::ws::JoinedSuccess,
            crate::dto::ws::RosterUpdate,
            crate::dto::ws::PlayerScore,
            crate::dto::ws::NewQuestion,
            crate::dto::ws::AnswerResult,
            crate::dto::ws::AnswerStats,
            crate::dto::ws::ShowScores,
            crate::dto::ws::FinalScore,
            crate::dto::ws::GameOver,
            crate::dto::ws::StatsSaved,
            crate::dto::ws::ErrorMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "quiz", description = "Quiz library"),
        (name = "history", description = "Finished game records"),
        (name = "sessions", description = "Live session lookup"),
        (name = "live", description = "WebSocket protocol for hosts and players"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_rest_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/healthcheck",
            "/ws",
            "/api/quiz",
            "/api/quiz/{id}",
            "/api/history",
            "/api/history/{id}",
            "/api/sessions/{code}",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
