//! Read models of stored game records.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{
    FinalScoreEntity, GameRecordEntity, GameRecordListItemEntity, PlayerAnswerEntity,
    QuestionDetailEntity,
};
use crate::dto::format_system_time;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameRecordSummary {
    pub id: Uuid,
    pub pin: String,
    pub quiz_title: String,
    pub finished_at: String,
    pub total_players: u32,
    pub winner: Option<String>,
}

impl From<GameRecordListItemEntity> for GameRecordSummary {
    fn from(entity: GameRecordListItemEntity) -> Self {
        Self {
            id: entity.id,
            pin: entity.pin,
            quiz_title: entity.quiz_title,
            finished_at: format_system_time(entity.finished_at),
            total_players: entity.total_players,
            winner: entity.winner,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAnswerView {
    pub username: String,
    /// -1 when the player did not answer.
    pub answer_index: i32,
    pub time_left: f64,
    pub is_correct: bool,
    pub points_earned: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetailView {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_index: u8,
    pub time_limit: u32,
    pub player_answers: Vec<PlayerAnswerView>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalScoreView {
    pub username: String,
    pub score: u32,
    pub rank: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
}

/// Full record of a finished session.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameRecordDetail {
    pub id: Uuid,
    pub pin: String,
    pub quiz_title: String,
    pub quiz_id: Option<String>,
    pub started_at: String,
    pub finished_at: String,
    pub total_players: u32,
    pub questions: Vec<QuestionDetailView>,
    pub final_scores: Vec<FinalScoreView>,
}

impl From<PlayerAnswerEntity> for PlayerAnswerView {
    fn from(entity: PlayerAnswerEntity) -> Self {
        Self {
            username: entity.username,
            answer_index: entity.answer_index,
            time_left: entity.time_left,
            is_correct: entity.is_correct,
            points_earned: entity.points_earned,
        }
    }
}

impl From<QuestionDetailEntity> for QuestionDetailView {
    fn from(entity: QuestionDetailEntity) -> Self {
        Self {
            question_text: entity.question_text,
            options: entity.options,
            correct_index: entity.correct_index,
            time_limit: entity.time_limit,
            player_answers: entity.player_answers.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<FinalScoreEntity> for FinalScoreView {
    fn from(entity: FinalScoreEntity) -> Self {
        Self {
            username: entity.username,
            score: entity.score,
            rank: entity.rank,
            correct_answers: entity.correct_answers,
            total_questions: entity.total_questions,
        }
    }
}

impl From<GameRecordEntity> for GameRecordDetail {
    fn from(entity: GameRecordEntity) -> Self {
        Self {
            id: entity.id,
            pin: entity.pin,
            quiz_title: entity.quiz_title,
            quiz_id: entity.quiz_id,
            started_at: format_system_time(entity.started_at),
            finished_at: format_system_time(entity.finished_at),
            total_players: entity.total_players,
            questions: entity.questions.into_iter().map(Into::into).collect(),
            final_scores: entity.final_scores.into_iter().map(Into::into).collect(),
        }
    }
}
