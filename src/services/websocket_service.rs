use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::ClientMessage,
    error::ServiceError,
    services::{session_events, session_service},
    state::{
        SharedState,
        dispatcher::{Connection, ConnectionId},
    },
};

/// Handle the full lifecycle of one host or player WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();
    let connection_id: ConnectionId = Uuid::new_v4();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        let mut outbound = UnboundedReceiverStream::new(outbound_rx);
        while let Some(message) = outbound.next().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    state
        .dispatcher()
        .register(Connection::new(connection_id, outbound_tx.clone()));
    info!(connection = %connection_id, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_text(&state, connection_id, text.as_str()).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                debug!(connection = %connection_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {
                session_events::send_error(
                    &state,
                    &connection_id,
                    "binary frames are not supported".into(),
                );
            }
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    session_service::disconnect(&state, connection_id).await;
    info!(connection = %connection_id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Parse and dispatch one text frame. Failures are reported to the sender only.
async fn handle_text(state: &SharedState, connection: ConnectionId, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(connection = %connection, error = %err, "failed to parse client message");
            session_events::send_error(state, &connection, format!("malformed message: {err}"));
            return;
        }
    };

    let event = message.name();
    debug!(connection = %connection, event, "received client message");
    if let Err(err) = dispatch(state, connection, message).await {
        report(state, connection, event, err);
    }
}

async fn dispatch(
    state: &SharedState,
    connection: ConnectionId,
    message: ClientMessage,
) -> Result<(), ServiceError> {
    match message {
        ClientMessage::CreateGame(payload) => {
            session_service::create_session(state, connection, payload).await?;
        }
        ClientMessage::StartGame(payload) => {
            session_service::start_game(state, connection, payload).await?;
        }
        ClientMessage::JoinGame(payload) => {
            session_service::join_game(state, connection, payload).await?;
        }
        ClientMessage::SubmitAnswer(payload) => {
            session_service::submit_answer(state, connection, payload).await?;
        }
        ClientMessage::NextQuestion(payload) => {
            session_service::advance(state, connection, payload).await?;
        }
        ClientMessage::FinishGame(payload) => {
            session_service::finish_game(state, connection, payload).await?;
        }
    }
    Ok(())
}

fn report(state: &SharedState, connection: ConnectionId, event: &str, err: ServiceError) {
    match &err {
        ServiceError::Unavailable(_) | ServiceError::Persistence(_) | ServiceError::Timeout => {
            warn!(connection = %connection, event, error = %err, "request failed");
        }
        _ => debug!(connection = %connection, event, error = %err, "request rejected"),
    }
    session_events::send_error(state, &connection, err.to_string());
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, registry::SessionRegistry},
    };

    fn connect(state: &SharedState) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        state.dispatcher().register(Connection::new(id, tx));
        (id, rx)
    }

    fn next_event(rx: &mut mpsc::UnboundedReceiver<Message>) -> Value {
        match rx.try_recv() {
            Ok(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_frames_produce_an_error_event() {
        let state = AppState::new(AppConfig::default());
        let (id, mut rx) = connect(&state);

        handle_text(&state, id, "not json").await;
        let event = next_event(&mut rx);
        assert_eq!(event["event"], "error");
        assert!(event["data"]["message"].as_str().unwrap().starts_with("malformed message"));
    }

    #[tokio::test]
    async fn frames_are_routed_to_the_coordinator() {
        let state = AppState::with_registry(
            AppConfig::default(),
            SessionRegistry::with_generator(|| "123456".into()),
        );
        let (host, mut host_rx) = connect(&state);
        let (player, mut player_rx) = connect(&state);

        let create = r#"{"event":"create_game","data":{"quizTitle":"T","questions":[
            {"question":"Q","options":["a","b","c","d"],"correctAnswer":1,"timeLimit":20}]}}"#;
        handle_text(&state, host, create).await;
        assert_eq!(next_event(&mut host_rx)["data"]["pin"], "123456");

        handle_text(
            &state,
            player,
            r#"{"event":"join_game","data":{"pin":"999999","username":"Alice"}}"#,
        )
        .await;
        assert_eq!(next_event(&mut player_rx)["event"], "error");

        handle_text(
            &state,
            player,
            r#"{"event":"join_game","data":{"pin":"123456","username":"Alice"}}"#,
        )
        .await;
        assert_eq!(next_event(&mut player_rx)["event"], "joined_success");
        assert_eq!(next_event(&mut host_rx)["event"], "player_joined");
    }
}
