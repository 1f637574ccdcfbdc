use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{
        FinalScoreEntity, GameRecordEntity, PlayerAnswerEntity, QuestionDetailEntity,
        QuestionEntity,
    },
    state::dispatcher::ConnectionId,
};

/// Every question offers exactly this many options.
pub const OPTION_COUNT: usize = 4;
/// Shortest accepted answer window, in seconds.
pub const MIN_TIME_LIMIT: u32 = 5;
/// Longest accepted answer window, in seconds.
pub const MAX_TIME_LIMIT: u32 = 120;

/// Reasons a question definition is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    #[error("question text must not be empty")]
    EmptyText,
    #[error("a question needs exactly {OPTION_COUNT} options (got {0})")]
    OptionCount(usize),
    #[error("correct option index {0} is out of range")]
    CorrectIndex(usize),
    #[error("time limit {0}s is outside {MIN_TIME_LIMIT}-{MAX_TIME_LIMIT}s")]
    TimeLimit(u32),
}

/// Immutable question played during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    options: Vec<String>,
    correct_index: usize,
    time_limit: u32,
}

impl Question {
    /// Build a question, enforcing the option count, index and time window bounds.
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        time_limit: u32,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() != OPTION_COUNT {
            return Err(QuestionError::OptionCount(options.len()));
        }
        if correct_index >= OPTION_COUNT {
            return Err(QuestionError::CorrectIndex(correct_index));
        }
        if !(MIN_TIME_LIMIT..=MAX_TIME_LIMIT).contains(&time_limit) {
            return Err(QuestionError::TimeLimit(time_limit));
        }
        Ok(Self {
            text,
            options,
            correct_index,
            time_limit,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// Answer window in seconds.
    pub fn time_limit(&self) -> u32 {
        self.time_limit
    }
}

impl TryFrom<QuestionEntity> for Question {
    type Error = QuestionError;

    fn try_from(value: QuestionEntity) -> Result<Self, Self::Error> {
        Self::new(
            value.text,
            value.options,
            usize::from(value.correct_index),
            value.time_limit,
        )
    }
}

impl From<&Question> for QuestionEntity {
    fn from(value: &Question) -> Self {
        Self {
            text: value.text.clone(),
            options: value.options.clone(),
            correct_index: value.correct_index as u8,
            time_limit: value.time_limit,
        }
    }
}

/// Player info tracked during a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Connection the player joined from.
    pub connection: ConnectionId,
    /// Display name, unique within the session.
    pub username: String,
    /// Cumulative score.
    pub score: u32,
    /// Number of questions answered correctly.
    pub correct_answers: u32,
}

impl Player {
    pub fn new(connection: ConnectionId, username: String) -> Self {
        Self {
            connection,
            username,
            score: 0,
            correct_answers: 0,
        }
    }
}

/// Answer submitted by a player for a single question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub connection: ConnectionId,
    pub option_index: usize,
    /// Seconds left on the clock as reported by the client.
    pub time_remaining: f64,
    pub correct: bool,
    pub points: u32,
}

/// Persisted view of one player's answer to a question.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAnswerDetail {
    pub username: String,
    /// `None` when the player never answered.
    pub answer_index: Option<usize>,
    pub time_left: f64,
    pub is_correct: bool,
    pub points_earned: u32,
}

impl PlayerAnswerDetail {
    /// Placeholder recorded for a player who let the question run out.
    pub fn unanswered(username: String) -> Self {
        Self {
            username,
            answer_index: None,
            time_left: 0.0,
            is_correct: false,
            points_earned: 0,
        }
    }
}

/// Question snapshot paired with the answers it received.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDetail {
    pub question: Question,
    pub player_answers: Vec<PlayerAnswerDetail>,
}

/// Intermediate scoreboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub username: String,
    pub score: u32,
}

/// Final scoreboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalScoreEntry {
    pub username: String,
    pub score: u32,
    /// 1-based position; equal scores keep join order.
    pub rank: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
}

/// Finalized projection of a session handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub id: Uuid,
    pub pin: String,
    pub quiz_title: String,
    pub quiz_id: Option<String>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
    pub total_players: u32,
    pub questions: Vec<QuestionDetail>,
    pub final_scores: Vec<FinalScoreEntry>,
}

impl From<PlayerAnswerDetail> for PlayerAnswerEntity {
    fn from(value: PlayerAnswerDetail) -> Self {
        Self {
            username: value.username,
            answer_index: value.answer_index.map_or(-1, |index| index as i32),
            time_left: value.time_left,
            is_correct: value.is_correct,
            points_earned: value.points_earned,
        }
    }
}

impl From<QuestionDetail> for QuestionDetailEntity {
    fn from(value: QuestionDetail) -> Self {
        let QuestionEntity {
            text,
            options,
            correct_index,
            time_limit,
        } = QuestionEntity::from(&value.question);
        Self {
            question_text: text,
            options,
            correct_index,
            time_limit,
            player_answers: value.player_answers.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<FinalScoreEntry> for FinalScoreEntity {
    fn from(value: FinalScoreEntry) -> Self {
        Self {
            username: value.username,
            score: value.score,
            rank: value.rank,
            correct_answers: value.correct_answers,
            total_questions: value.total_questions,
        }
    }
}

impl From<GameRecord> for GameRecordEntity {
    fn from(value: GameRecord) -> Self {
        Self {
            id: value.id,
            pin: value.pin,
            quiz_title: value.quiz_title,
            quiz_id: value.quiz_id,
            started_at: value.started_at,
            finished_at: value.finished_at,
            total_players: value.total_players,
            questions: value.questions.into_iter().map(Into::into).collect(),
            final_scores: value.final_scores.into_iter().map(Into::into).collect(),
        }
    }
}
