use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::ws::{
        AnswerResult, AnswerStats, Empty, ErrorMessage, FinalScore, GameCreated, GameOver,
        JoinedSuccess, NewQuestion, PlayerScore, RosterUpdate, ServerEvent, ShowScores,
        StatsSaved,
    },
    state::{
        SharedState,
        answers::AnswerTally,
        dispatcher::{Audience, ConnectionId},
        game::{FinalScoreEntry, Standing},
        roster::PlayerRoster,
        session::{AnswerFeedback, OpenedQuestion},
    },
};

pub const EVENT_GAME_CREATED: &str = "game_created";
pub const EVENT_GAME_STARTED: &str = "game_started";
pub const EVENT_NEW_QUESTION: &str = "new_question";
pub const EVENT_JOINED_SUCCESS: &str = "joined_success";
pub const EVENT_PLAYER_JOINED: &str = "player_joined";
pub const EVENT_ANSWER_RESULT: &str = "answer_result";
pub const EVENT_ANSWER_STATS: &str = "answer_stats";
pub const EVENT_SHOW_SCORES: &str = "show_scores";
pub const EVENT_GAME_OVER: &str = "game_over";
pub const EVENT_STATS_SAVED: &str = "stats_saved";
pub const EVENT_STATS_SAVE_FAILED: &str = "stats_save_failed";
pub const EVENT_HOST_LEFT: &str = "host_left";
pub const EVENT_ERROR: &str = "error";

/// Tell the host which join code its new session got.
pub fn send_game_created(state: &SharedState, host: &ConnectionId, pin: &str) {
    let payload = GameCreated { pin: pin.to_owned() };
    send_direct(state, host, EVENT_GAME_CREATED, &payload);
}

pub fn broadcast_game_started(state: &SharedState, pin: &str) {
    publish(state, pin, Audience::Room, EVENT_GAME_STARTED, &Empty {});
}

/// Put a question on every screen of the room.
pub fn broadcast_new_question(state: &SharedState, pin: &str, opened: &OpenedQuestion) {
    let payload = NewQuestion {
        question: opened.question.text().to_owned(),
        options: opened.question.options().to_vec(),
        question_number: opened.number,
        total_questions: opened.total,
        time_limit: opened.question.time_limit(),
    };
    publish(state, pin, Audience::Room, EVENT_NEW_QUESTION, &payload);
}

pub fn send_joined(state: &SharedState, player: &ConnectionId, username: &str, pin: &str) {
    let payload = JoinedSuccess {
        username: username.to_owned(),
        pin: pin.to_owned(),
    };
    send_direct(state, player, EVENT_JOINED_SUCCESS, &payload);
}

/// Send the current roster to the host.
pub fn notify_roster(state: &SharedState, pin: &str, roster: &PlayerRoster) {
    let payload = RosterUpdate {
        players: roster
            .iter()
            .map(|player| PlayerScore {
                username: player.username.clone(),
                score: player.score,
            })
            .collect(),
    };
    publish(state, pin, Audience::Host, EVENT_PLAYER_JOINED, &payload);
}

pub fn send_answer_result(state: &SharedState, player: &ConnectionId, feedback: &AnswerFeedback) {
    let payload = AnswerResult {
        correct: feedback.correct,
        points: feedback.points,
        new_score: feedback.new_score,
        correct_answer: feedback.correct_index,
    };
    send_direct(state, player, EVENT_ANSWER_RESULT, &payload);
}

/// Send the live answer distribution to the host.
pub fn notify_answer_stats(
    state: &SharedState,
    pin: &str,
    tally: &AnswerTally,
    total_players: usize,
) {
    let payload = AnswerStats {
        question_index: tally.question_index,
        stats: tally.counts.to_vec(),
        total_answered: tally.total_answered,
        total_players,
    };
    publish(state, pin, Audience::Host, EVENT_ANSWER_STATS, &payload);
}

pub fn broadcast_show_scores(state: &SharedState, pin: &str, standings: &[Standing]) {
    let payload = ShowScores {
        players: standings
            .iter()
            .map(|standing| PlayerScore {
                username: standing.username.clone(),
                score: standing.score,
            })
            .collect(),
    };
    publish(state, pin, Audience::Room, EVENT_SHOW_SCORES, &payload);
}

/// Announce the final ranking; the winner is the first entry.
pub fn broadcast_game_over(state: &SharedState, pin: &str, scores: &[FinalScoreEntry]) {
    let scores: Vec<FinalScore> = scores
        .iter()
        .map(|entry| FinalScore {
            username: entry.username.clone(),
            score: entry.score,
            rank: entry.rank,
            correct_answers: entry.correct_answers,
            total_questions: entry.total_questions,
        })
        .collect();
    let payload = GameOver {
        winner: scores.first().cloned(),
        scores,
    };
    publish(state, pin, Audience::Room, EVENT_GAME_OVER, &payload);
}

pub fn send_stats_saved(state: &SharedState, host: &ConnectionId, record_id: Uuid) {
    let payload = StatsSaved {
        id: record_id.to_string(),
    };
    send_direct(state, host, EVENT_STATS_SAVED, &payload);
}

pub fn send_stats_save_failed(state: &SharedState, host: &ConnectionId, message: String) {
    send_direct(state, host, EVENT_STATS_SAVE_FAILED, &ErrorMessage { message });
}

/// Tell everyone left in the room that the session is gone.
pub fn broadcast_host_left(state: &SharedState, pin: &str) {
    publish(state, pin, Audience::Room, EVENT_HOST_LEFT, &Empty {});
}

pub fn send_error(state: &SharedState, connection: &ConnectionId, message: String) {
    send_direct(state, connection, EVENT_ERROR, &ErrorMessage { message });
}

fn publish(
    state: &SharedState,
    pin: &str,
    audience: Audience,
    event: &'static str,
    payload: &impl Serialize,
) {
    match ServerEvent::json(event, payload) {
        Ok(event) => {
            state.dispatcher().publish(pin, audience, &event);
        }
        Err(err) => warn!(pin, event, error = %err, "failed to serialize session event"),
    }
}

fn send_direct(
    state: &SharedState,
    connection: &ConnectionId,
    event: &'static str,
    payload: &impl Serialize,
) {
    match ServerEvent::json(event, payload) {
        Ok(event) => {
            state.dispatcher().send_to(connection, &event);
        }
        Err(err) => warn!(%connection, event, error = %err, "failed to serialize session event"),
    }
}
