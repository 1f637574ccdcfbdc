use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{QuestionEntity, QuizEntity},
    dto::quiz::{CreateQuizRequest, QuizDetail, QuizSummary},
    error::ServiceError,
    state::{SharedState, game::Question},
};

/// Store a new quiz. The payload is expected to be validated already.
pub async fn create_quiz(
    state: &SharedState,
    request: CreateQuizRequest,
) -> Result<QuizDetail, ServiceError> {
    let store = state.require_game_store().await?;

    let questions = request
        .questions
        .into_iter()
        .map(|input| Question::try_from(input).map(|question| QuestionEntity::from(&question)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let quiz = QuizEntity {
        id: Uuid::new_v4(),
        title: request.title.trim().to_owned(),
        description: request.description,
        questions,
        created_at: SystemTime::now(),
    };
    store.save_quiz(quiz.clone()).await?;

    info!(quiz = %quiz.id, title = %quiz.title, "quiz created");
    Ok(quiz.into())
}

/// Stored quizzes, newest first.
pub async fn list_quizzes(state: &SharedState) -> Result<Vec<QuizSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    let quizzes = store.list_quizzes().await?;
    Ok(quizzes.into_iter().map(Into::into).collect())
}

pub async fn get_quiz(state: &SharedState, id: Uuid) -> Result<QuizDetail, ServiceError> {
    let store = state.require_game_store().await?;

    let Some(quiz) = store.find_quiz(id).await? else {
        return Err(ServiceError::NotFound(format!("quiz `{id}` not found")));
    };
    Ok(quiz.into())
}

pub async fn delete_quiz(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;

    if !store.delete_quiz(id).await? {
        return Err(ServiceError::NotFound(format!("quiz `{id}` not found")));
    }
    info!(quiz = %id, "quiz deleted");
    Ok(())
}
