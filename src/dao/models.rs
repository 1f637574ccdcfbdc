use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Stored quiz definition authored ahead of a live session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizEntity {
    /// Stable identifier for the quiz.
    pub id: Uuid,
    /// Title shown on the host screen.
    pub title: String,
    /// Optional free-form description.
    pub description: String,
    /// Ordered questions of the quiz.
    pub questions: Vec<QuestionEntity>,
    /// Creation timestamp, used to list the newest quizzes first.
    pub created_at: SystemTime,
}

/// Single multiple-choice question of a stored quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Question text.
    pub text: String,
    /// Exactly four answer options.
    pub options: Vec<String>,
    /// Index (0-3) of the correct option.
    pub correct_index: u8,
    /// Answer window in seconds (5-120).
    pub time_limit: u32,
}

/// Finalized projection of a completed live session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecordEntity {
    /// Identifier assigned when the record is stored.
    pub id: Uuid,
    /// Join code the session ran under.
    pub pin: String,
    /// Quiz title at the time of the session.
    pub quiz_title: String,
    /// Identifier of the stored quiz, when the session was created from one.
    pub quiz_id: Option<String>,
    /// When the host started the game.
    pub started_at: SystemTime,
    /// When the host finalized the game.
    pub finished_at: SystemTime,
    /// Number of players present when the game ended.
    pub total_players: u32,
    /// Per-question details including every player's answer.
    pub questions: Vec<QuestionDetailEntity>,
    /// Ranked final scoreboard.
    pub final_scores: Vec<FinalScoreEntity>,
}

/// Question snapshot with the answers submitted during the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionDetailEntity {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_index: u8,
    pub time_limit: u32,
    pub player_answers: Vec<PlayerAnswerEntity>,
}

/// Answer given by one player to one question. `answer_index` is -1 when the
/// player never answered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerAnswerEntity {
    pub username: String,
    pub answer_index: i32,
    pub time_left: f64,
    pub is_correct: bool,
    pub points_earned: u32,
}

/// Entry of the ranked final scoreboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalScoreEntity {
    pub username: String,
    pub score: u32,
    pub rank: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
}

/// Lightweight listing row for stored game records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecordListItemEntity {
    pub id: Uuid,
    pub pin: String,
    pub quiz_title: String,
    pub finished_at: SystemTime,
    pub total_players: u32,
    /// Display name of the top-ranked player, if anyone played.
    pub winner: Option<String>,
}

impl From<GameRecordEntity> for GameRecordListItemEntity {
    fn from(entity: GameRecordEntity) -> Self {
        let winner = entity
            .final_scores
            .iter()
            .find(|entry| entry.rank == 1)
            .map(|entry| entry.username.clone());
        Self {
            id: entity.id,
            pin: entity.pin,
            quiz_title: entity.quiz_title,
            finished_at: entity.finished_at,
            total_players: entity.total_players,
            winner,
        }
    }
}
