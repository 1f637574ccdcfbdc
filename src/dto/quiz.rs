//! DTO definitions for the quiz REST API and inline game questions.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{QuestionEntity, QuizEntity},
    dto::{format_system_time, validation::validate_not_blank},
    state::game::{Question, QuestionError},
};

fn default_time_limit() -> u32 {
    20
}

/// Question definition as sent by quiz authors and hosts.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    #[serde(alias = "question")]
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
    #[validate(length(equal = 4, message = "a question needs exactly 4 options"))]
    pub options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    #[validate(range(max = 3, message = "correct index must be between 0 and 3"))]
    pub correct_index: usize,
    /// Seconds, defaults to 20.
    #[serde(default = "default_time_limit")]
    #[validate(range(min = 5, max = 120, message = "time limit must be between 5 and 120 seconds"))]
    pub time_limit: u32,
}

impl TryFrom<QuestionInput> for Question {
    type Error = QuestionError;

    fn try_from(value: QuestionInput) -> Result<Self, Self::Error> {
        Question::new(value.text, value.options, value.correct_index, value.time_limit)
    }
}

/// Payload used to store a new quiz.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuizRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "a quiz needs at least one question"), nested)]
    pub questions: Vec<QuestionInput>,
}

/// Question as returned by the quiz API.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: u8,
    pub time_limit: u32,
}

impl From<QuestionEntity> for QuestionView {
    fn from(entity: QuestionEntity) -> Self {
        Self {
            text: entity.text,
            options: entity.options,
            correct_index: entity.correct_index,
            time_limit: entity.time_limit,
        }
    }
}

/// Listing row for stored quizzes.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub question_count: usize,
    pub created_at: String,
}

impl From<QuizEntity> for QuizSummary {
    fn from(entity: QuizEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            description: entity.description,
            question_count: entity.questions.len(),
            created_at: format_system_time(entity.created_at),
        }
    }
}

/// Full stored quiz.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub questions: Vec<QuestionView>,
    pub created_at: String,
}

impl From<QuizEntity> for QuizDetail {
    fn from(entity: QuizEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            description: entity.description,
            questions: entity.questions.into_iter().map(Into::into).collect(),
            created_at: format_system_time(entity.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn question(correct_index: usize, time_limit: u32) -> serde_json::Value {
        json!({
            "text": "2 + 2?",
            "options": ["3", "4", "5", "6"],
            "correctIndex": correct_index,
            "timeLimit": time_limit,
        })
    }

    #[test]
    fn time_limit_defaults_to_twenty_seconds() {
        let input: QuestionInput = serde_json::from_value(json!({
            "question": "2 + 2?",
            "options": ["3", "4", "5", "6"],
            "correctAnswer": 1,
        }))
        .unwrap();

        assert_eq!(input.time_limit, 20);
        assert_eq!(input.text, "2 + 2?");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn quiz_request_rejects_out_of_range_questions() {
        let request: CreateQuizRequest = serde_json::from_value(json!({
            "title": "Maths",
            "questions": [question(4, 20), question(1, 121)],
        }))
        .unwrap();

        assert!(request.validate().unwrap_err().errors().contains_key("questions"));
        assert!(request.questions[0].validate().is_err());
        assert!(request.questions[1].validate().is_err());
    }

    #[test]
    fn quiz_request_needs_a_title_and_questions() {
        let request: CreateQuizRequest = serde_json::from_value(json!({
            "title": "  ",
            "questions": [],
        }))
        .unwrap();

        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("questions"));
    }

    #[test]
    fn validated_input_converts_into_a_question() {
        let input: QuestionInput = serde_json::from_value(question(1, 30)).unwrap();
        let question = Question::try_from(input).unwrap();
        assert_eq!(question.correct_index(), 1);
        assert_eq!(question.time_limit(), 30);
    }
}
