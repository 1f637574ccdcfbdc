use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::SessionPhase;

/// Session phase as exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleSessionPhase {
    /// Accepting players.
    Lobby,
    /// Countdown before the first question.
    Starting,
    /// A question is on screen.
    Question,
    /// Scoreboard between rounds.
    Scores,
    /// Final scoreboard, waiting to be saved.
    GameOver,
    /// Saved and closed.
    Finished,
}

impl From<SessionPhase> for VisibleSessionPhase {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Lobby => Self::Lobby,
            SessionPhase::Starting => Self::Starting,
            SessionPhase::QuestionActive => Self::Question,
            SessionPhase::ShowingScores => Self::Scores,
            SessionPhase::GameOver => Self::GameOver,
            SessionPhase::Finalized => Self::Finished,
        }
    }
}

/// Public view of an active session, used by players to check a join code.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub pin: String,
    pub quiz_title: String,
    pub phase: VisibleSessionPhase,
    pub player_count: usize,
    pub total_questions: usize,
    /// Whether a new player may still join.
    pub joinable: bool,
}
