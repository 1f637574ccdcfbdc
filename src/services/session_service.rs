//! Coordinator of live sessions: routes each inbound request to its session, applies it
//! under the session lock and publishes the resulting events.

use std::time::SystemTime;

use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        session::SessionStatus,
        ws::{CreateGamePayload, JoinGamePayload, PinPayload, SubmitAnswerPayload},
    },
    error::ServiceError,
    services::session_events,
    state::{
        SharedState,
        dispatcher::ConnectionId,
        game::Question,
        registry::SessionHandle,
        scheduler::schedule,
        session::{GameSession, RoundOutcome, SessionError},
        state_machine::SessionPhase,
    },
};

const DEFAULT_QUIZ_TITLE: &str = "Quiz";

/// Open a session hosted by `host` and send it the join code.
pub async fn create_session(
    state: &SharedState,
    host: ConnectionId,
    payload: CreateGamePayload,
) -> Result<String, ServiceError> {
    let (title, quiz_id, questions) = resolve_questions(state, payload).await?;

    let (pin, _handle) = state
        .registry()
        .create(|pin| GameSession::new(pin, title, quiz_id, questions, host))?;
    state.dispatcher().attach_host(&pin, host);

    info!(pin = %pin, connection = %host, "session created");
    session_events::send_game_created(state, &host, &pin);
    Ok(pin)
}

/// Add a player to a session still in its lobby.
pub async fn join_game(
    state: &SharedState,
    connection: ConnectionId,
    payload: JoinGamePayload,
) -> Result<(), ServiceError> {
    payload.validate()?;
    let JoinGamePayload { pin, username } = payload;
    let handle = lookup(state, &pin)?;
    let mut session = handle.lock().await;

    session.join(connection, username.clone())?;
    state.dispatcher().join_room(&pin, connection);

    info!(pin = %pin, connection = %connection, player = %username, "player joined");
    session_events::send_joined(state, &connection, &username, &pin);
    session_events::notify_roster(state, &pin, session.roster());
    Ok(())
}

/// Leave the lobby and schedule the first question after the start countdown.
pub async fn start_game(
    state: &SharedState,
    connection: ConnectionId,
    payload: PinPayload,
) -> Result<(), ServiceError> {
    payload.validate()?;
    let pin = payload.pin;
    let handle = lookup(state, &pin)?;
    let mut session = handle.lock().await;

    let result = session.start(&connection, SystemTime::now());
    if settle(result, &pin, connection)?.is_none() {
        return Ok(());
    }

    info!(pin = %pin, players = session.roster().len(), "game started");
    session_events::broadcast_game_started(state, &pin);

    let task = schedule(
        state.config().start_delay,
        open_first_question(state.clone(), pin, session.id(), session.version()),
    );
    session.set_pending_task(task);
    Ok(())
}

/// Close the active question: show the scoreboard now and move on after the results delay.
pub async fn advance(
    state: &SharedState,
    connection: ConnectionId,
    payload: PinPayload,
) -> Result<(), ServiceError> {
    payload.validate()?;
    let pin = payload.pin;
    let handle = lookup(state, &pin)?;
    let mut session = handle.lock().await;

    let Some(standings) = settle(session.advance(&connection), &pin, connection)? else {
        return Ok(());
    };

    debug!(pin = %pin, question = ?session.current_question(), "question closed");
    session_events::broadcast_show_scores(state, &pin, &standings);

    let task = schedule(
        state.config().results_delay,
        conclude_round(state.clone(), pin, session.id(), session.version()),
    );
    session.set_pending_task(task);
    Ok(())
}

/// Score an answer, reply privately to the player and refresh the host's tally.
pub async fn submit_answer(
    state: &SharedState,
    connection: ConnectionId,
    payload: SubmitAnswerPayload,
) -> Result<(), ServiceError> {
    payload.validate()?;
    let handle = lookup(state, &payload.pin)?;
    let mut session = handle.lock().await;

    let result = session.submit_answer(connection, payload.answer_index, payload.time_left);
    let Some(outcome) = settle(result, &payload.pin, connection)? else {
        return Ok(());
    };

    debug!(
        pin = %payload.pin,
        connection = %connection,
        correct = outcome.feedback.correct,
        points = outcome.feedback.points,
        "answer recorded"
    );
    session_events::send_answer_result(state, &connection, &outcome.feedback);
    session_events::notify_answer_stats(
        state,
        &payload.pin,
        &outcome.tally,
        outcome.total_players,
    );
    Ok(())
}

/// Store the game record of a finished session, then close it.
///
/// A failed save is reported to the host and the session stays in game over so the host
/// can try again.
pub async fn finish_game(
    state: &SharedState,
    connection: ConnectionId,
    payload: PinPayload,
) -> Result<(), ServiceError> {
    payload.validate()?;
    let pin = payload.pin;
    let handle = lookup(state, &pin)?;

    let (plan, record, session_id) = {
        let mut session = handle.lock().await;
        let Some(plan) = settle(session.plan_finalize(&connection), &pin, connection)? else {
            return Ok(());
        };
        (plan, session.game_record(SystemTime::now()), session.id())
    };
    let record_id = record.id;

    let saved = match state.require_game_store().await {
        Ok(store) => match timeout(
            state.config().save_timeout,
            store.save_game_record(record.into()),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(ServiceError::Persistence(err.to_string())),
            Err(_) => Err(ServiceError::Timeout),
        },
        Err(err) => Err(err),
    };

    let mut session = handle.lock().await;
    match saved {
        Ok(()) => {
            if let Err(err) = session.apply_finalize(plan) {
                warn!(pin = %pin, error = %err, "finalize plan vanished after save");
            }
            info!(pin = %pin, record = %record_id, "game record saved");
            session_events::send_stats_saved(state, &connection, record_id);

            session.close();
            state.registry().remove_if_same(&pin, session_id);
            state.dispatcher().close_room(&pin);
        }
        Err(err) => {
            if let Err(abort_err) = session.abort_finalize(plan) {
                warn!(pin = %pin, error = %abort_err, "failed to release finalize plan");
            }
            warn!(pin = %pin, error = %err, "game record not saved; session kept for retry");
            session_events::send_stats_save_failed(state, &connection, err.to_string());
        }
    }
    Ok(())
}

/// Tear down what a closed connection leaves behind.
///
/// A player is removed from its session; a host takes its whole session down and the
/// remaining room is told so.
pub async fn disconnect(state: &SharedState, connection: ConnectionId) {
    for pin in state.dispatcher().unregister(&connection) {
        let Some(handle) = state.registry().lookup(&pin) else {
            continue;
        };
        let mut session = handle.lock().await;

        if session.is_host(&connection) {
            session.close();
            state.registry().remove_if_same(&pin, session.id());
            session_events::broadcast_host_left(state, &pin);
            state.dispatcher().close_room(&pin);
            info!(pin = %pin, connection = %connection, "host left; session removed");
        } else if let Some(player) = session.leave(&connection) {
            info!(pin = %pin, connection = %connection, player = %player.username, "player left");
            session_events::notify_roster(state, &pin, session.roster());
        }
    }
}

/// Public status of a join code.
pub async fn session_status(state: &SharedState, pin: &str) -> Result<SessionStatus, ServiceError> {
    let handle = lookup(state, pin)?;
    let session = handle.lock().await;
    let phase = session.phase();
    Ok(SessionStatus {
        pin: pin.to_owned(),
        quiz_title: session.quiz_title().to_owned(),
        phase: phase.into(),
        player_count: session.roster().len(),
        total_questions: session.question_count(),
        joinable: phase == SessionPhase::Lobby,
    })
}

async fn open_first_question(state: SharedState, pin: String, session_id: Uuid, version: usize) {
    let Some(handle) = current_session(&state, &pin, session_id) else {
        return;
    };
    let mut session = handle.lock().await;
    if session.id() != session_id || session.version() != version {
        debug!(pin = %pin, "session moved on before the countdown ended");
        return;
    }

    match session.open_next_question() {
        Ok(opened) => {
            debug!(pin = %pin, question = opened.number, "question opened");
            session_events::broadcast_new_question(&state, &pin, &opened);
        }
        Err(err) => debug!(pin = %pin, error = %err, "first question not opened"),
    }
}

async fn conclude_round(state: SharedState, pin: String, session_id: Uuid, version: usize) {
    let Some(handle) = current_session(&state, &pin, session_id) else {
        return;
    };
    let mut session = handle.lock().await;
    if session.id() != session_id || session.version() != version {
        debug!(pin = %pin, "session moved on before the scoreboard ended");
        return;
    }

    match session.conclude_round() {
        Ok(RoundOutcome::Next(opened)) => {
            debug!(pin = %pin, question = opened.number, "question opened");
            session_events::broadcast_new_question(&state, &pin, &opened);
        }
        Ok(RoundOutcome::GameOver(scores)) => {
            info!(
                pin = %pin,
                winner = scores.first().map(|entry| entry.username.as_str()),
                "game over"
            );
            session_events::broadcast_game_over(&state, &pin, &scores);
        }
        Err(err) => debug!(pin = %pin, error = %err, "round not concluded"),
    }
}

/// Handle of `pin` if it still belongs to the session instance `session_id`.
fn current_session(state: &SharedState, pin: &str, session_id: Uuid) -> Option<SessionHandle> {
    if !state.registry().is_current(pin, session_id) {
        debug!(pin, "session gone before its scheduled step");
        return None;
    }
    state.registry().lookup(pin)
}

fn lookup(state: &SharedState, pin: &str) -> Result<SessionHandle, ServiceError> {
    state
        .registry()
        .lookup(pin)
        .ok_or_else(|| ServiceError::SessionNotFound(pin.to_owned()))
}

/// Drop late or repeated requests, surface the rest.
fn settle<T>(
    result: Result<T, SessionError>,
    pin: &str,
    connection: ConnectionId,
) -> Result<Option<T>, ServiceError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_silent() => {
            debug!(pin, connection = %connection, reason = %err, "request ignored");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

async fn resolve_questions(
    state: &SharedState,
    payload: CreateGamePayload,
) -> Result<(String, Option<String>, Vec<Question>), ServiceError> {
    let CreateGamePayload {
        quiz_title,
        quiz_id,
        questions,
    } = payload;
    let requested_title = quiz_title.filter(|title| !title.trim().is_empty());

    let (title, questions) = match &quiz_id {
        Some(raw_id) => {
            let id = Uuid::parse_str(raw_id)
                .map_err(|_| ServiceError::InvalidInput(format!("invalid quiz id `{raw_id}`")))?;
            let store = state.require_game_store().await?;
            let quiz = store
                .find_quiz(id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("quiz {id}")))?;
            let questions = quiz
                .questions
                .into_iter()
                .map(Question::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
            (requested_title.or(Some(quiz.title)), questions)
        }
        None => {
            for question in &questions {
                question.validate()?;
            }
            let questions = questions
                .into_iter()
                .map(Question::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
            (requested_title, questions)
        }
    };

    if questions.is_empty() {
        return Err(ServiceError::InvalidInput(
            "a game needs at least one question".into(),
        ));
    }

    let title = title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_QUIZ_TITLE.to_owned());
    Ok((title, quiz_id, questions))
}
