//! Frames exchanged with quiz WebSocket clients.
//!
//! Both directions share the `{"event": "<name>", "data": <payload>}` envelope.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::{
    quiz::QuestionInput,
    validation::{validate_display_name, validate_join_code},
};

/// Messages accepted from host and player connections.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateGame(CreateGamePayload),
    StartGame(PinPayload),
    JoinGame(JoinGamePayload),
    SubmitAnswer(SubmitAnswerPayload),
    NextQuestion(PinPayload),
    FinishGame(PinPayload),
}

impl ClientMessage {
    /// Event name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateGame(_) => "create_game",
            Self::StartGame(_) => "start_game",
            Self::JoinGame(_) => "join_game",
            Self::SubmitAnswer(_) => "submit_answer",
            Self::NextQuestion(_) => "next_question",
            Self::FinishGame(_) => "finish_game",
        }
    }
}

/// Host request to open a new session, either from inline questions or a stored quiz.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGamePayload {
    #[serde(default)]
    pub quiz_title: Option<String>,
    #[serde(default)]
    pub quiz_id: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

/// Payload of the host commands that only name their session.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PinPayload {
    #[validate(custom(function = "validate_join_code"))]
    pub pin: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct JoinGamePayload {
    #[validate(custom(function = "validate_join_code"))]
    pub pin: String,
    #[validate(custom(function = "validate_display_name"))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerPayload {
    #[validate(custom(function = "validate_join_code"))]
    pub pin: String,
    pub answer_index: usize,
    /// Seconds left on the player's countdown.
    pub time_left: f64,
}

/// Serialized outbound frame, ready to be pushed to any number of connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    name: &'static str,
    frame: String,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

impl ServerEvent {
    /// Wrap `payload` into the event envelope and serialize it once.
    pub fn json<T: Serialize>(name: &'static str, payload: &T) -> serde_json::Result<Self> {
        let frame = serde_json::to_string(&Envelope {
            event: name,
            data: payload,
        })?;
        Ok(Self { name, frame })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn frame(&self) -> &str {
        &self.frame
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GameCreated {
    pub pin: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JoinedSuccess {
    pub username: String,
    pub pin: String,
}

/// Player as shown on the host's lobby and scoreboards.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct PlayerScore {
    pub username: String,
    pub score: u32,
}

/// Current roster, sent to the host whenever a player joins or leaves.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterUpdate {
    pub players: Vec<PlayerScore>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// 1-based position of the question.
    pub question_number: usize,
    pub total_questions: usize,
    /// Answer window in seconds.
    pub time_limit: u32,
}

/// Private feedback to the player who answered.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub correct: bool,
    pub points: u32,
    pub new_score: u32,
    /// Only present when the answer was wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<usize>,
}

/// Live answer distribution, sent to the host only.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerStats {
    pub question_index: usize,
    /// Submissions per option index.
    pub stats: Vec<u32>,
    pub total_answered: u32,
    pub total_players: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShowScores {
    pub players: Vec<PlayerScore>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinalScore {
    pub username: String,
    pub score: u32,
    pub rank: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GameOver {
    pub scores: Vec<FinalScore>,
    /// Top-ranked entry; absent when nobody is left in the room.
    pub winner: Option<FinalScore>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsSaved {
    pub id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorMessage {
    pub message: String,
}

/// Payload of the events that carry no data.
#[derive(Debug, Serialize, ToSchema)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn inbound_frames_use_the_event_envelope() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "event": "submit_answer",
            "data": { "pin": "123456", "answerIndex": 1, "timeLeft": 18.0 }
        }))
        .unwrap();

        match msg {
            ClientMessage::SubmitAnswer(payload) => {
                assert_eq!(payload.pin, "123456");
                assert_eq!(payload.answer_index, 1);
                assert_eq!(payload.time_left, 18.0);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn unknown_events_are_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"event":"buzz","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn create_game_accepts_a_stored_quiz_reference() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "event": "create_game",
            "data": { "quizId": "c6f0a0a4-5a43-4b4e-9a4c-1b0f1e9b7d2e" }
        }))
        .unwrap();

        let ClientMessage::CreateGame(payload) = msg else {
            panic!("expected create_game");
        };
        assert!(payload.questions.is_empty());
        assert!(payload.quiz_title.is_none());
        assert!(payload.quiz_id.is_some());
    }

    #[test]
    fn server_events_are_wrapped_once() {
        let event = ServerEvent::json(
            "answer_result",
            &AnswerResult {
                correct: false,
                points: 0,
                new_score: 0,
                correct_answer: Some(1),
            },
        )
        .unwrap();

        let value: Value = serde_json::from_str(event.frame()).unwrap();
        assert_eq!(event.name(), "answer_result");
        assert_eq!(
            value,
            json!({
                "event": "answer_result",
                "data": { "correct": false, "points": 0, "newScore": 0, "correctAnswer": 1 }
            })
        );
    }
}
