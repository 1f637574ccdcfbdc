use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::{
    models::{
        FinalScoreEntity, GameRecordEntity, QuestionDetailEntity, QuestionEntity, QuizEntity,
    },
    storage::StorageError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuizDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    questions: Vec<QuestionEntity>,
    created_at: DateTime,
}

impl From<QuizEntity> for MongoQuizDocument {
    fn from(value: QuizEntity) -> Self {
        Self {
            id: value.id.to_string(),
            title: value.title,
            description: value.description,
            questions: value.questions,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoQuizDocument> for QuizEntity {
    type Error = StorageError;

    fn try_from(value: MongoQuizDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            title: value.title,
            description: value.description,
            questions: value.questions,
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameRecordDocument {
    #[serde(rename = "_id")]
    id: String,
    pin: String,
    quiz_title: String,
    quiz_id: Option<String>,
    started_at: DateTime,
    finished_at: DateTime,
    total_players: u32,
    questions: Vec<QuestionDetailEntity>,
    final_scores: Vec<FinalScoreEntity>,
}

impl From<GameRecordEntity> for MongoGameRecordDocument {
    fn from(value: GameRecordEntity) -> Self {
        Self {
            id: value.id.to_string(),
            pin: value.pin,
            quiz_title: value.quiz_title,
            quiz_id: value.quiz_id,
            started_at: DateTime::from_system_time(value.started_at),
            finished_at: DateTime::from_system_time(value.finished_at),
            total_players: value.total_players,
            questions: value.questions,
            final_scores: value.final_scores,
        }
    }
}

impl TryFrom<MongoGameRecordDocument> for GameRecordEntity {
    type Error = StorageError;

    fn try_from(value: MongoGameRecordDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            pin: value.pin,
            quiz_title: value.quiz_title,
            quiz_id: value.quiz_id,
            started_at: value.started_at.to_system_time(),
            finished_at: value.finished_at.to_system_time(),
            total_players: value.total_players,
            questions: value.questions,
            final_scores: value.final_scores,
        })
    }
}

fn parse_id(raw: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(raw).map_err(|err| StorageError::corrupted(raw, err.to_string()))
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}
