//! Fan-out of session events to live WebSocket connections.
//!
//! The dispatcher owns the association between connections and the sessions they take
//! part in. Each session has two audiences: the whole room (host and players) and the
//! host alone. Delivery is best-effort and at-most-once: frames for a closed connection
//! are dropped and nothing is buffered or retried.

use axum::extract::ws::Message;
use dashmap::DashMap;
use indexmap::IndexSet;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dto::ws::ServerEvent;

/// Opaque identity of a WebSocket connection.
pub type ConnectionId = Uuid;

/// Handle used to push frames to one connected client.
#[derive(Clone, Debug)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
}

impl Connection {
    pub fn new(id: ConnectionId, tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue an event for this connection. Returns `false` once the writer has gone away.
    pub fn send(&self, event: &ServerEvent) -> bool {
        self.tx
            .send(Message::Text(event.frame().to_owned().into()))
            .is_ok()
    }
}

/// Who receives a session-scoped event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Host and every player of the session.
    Room,
    /// The host connection only.
    Host,
}

#[derive(Debug, Default)]
struct Room {
    host: Option<ConnectionId>,
    members: IndexSet<ConnectionId>,
}

#[derive(Debug)]
struct ConnectionEntry {
    connection: Connection,
    rooms: IndexSet<String>,
}

/// Registry of live connections and of session rooms keyed by join code.
#[derive(Debug, Default)]
pub struct BroadcastDispatcher {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    rooms: DashMap<String, Room>,
}

impl BroadcastDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly upgraded connection.
    pub fn register(&self, connection: Connection) {
        self.connections.insert(
            connection.id(),
            ConnectionEntry {
                connection,
                rooms: IndexSet::new(),
            },
        );
    }

    /// Forget a connection and return the join codes of the rooms it was part of.
    ///
    /// Nothing is delivered to the connection afterwards.
    pub fn unregister(&self, id: &ConnectionId) -> Vec<String> {
        let Some((_, entry)) = self.connections.remove(id) else {
            return Vec::new();
        };

        let pins: Vec<String> = entry.rooms.into_iter().collect();
        for pin in &pins {
            if let Some(mut room) = self.rooms.get_mut(pin) {
                room.members.shift_remove(id);
                if room.host == Some(*id) {
                    room.host = None;
                }
            }
        }
        pins
    }

    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Open the room of `pin` with `host` as its privileged member.
    pub fn attach_host(&self, pin: &str, host: ConnectionId) -> bool {
        if !self.track_membership(pin, host) {
            return false;
        }
        let mut room = self.rooms.entry(pin.to_owned()).or_default();
        room.host = Some(host);
        room.members.insert(host);
        true
    }

    /// Add a player connection to the room of `pin`.
    pub fn join_room(&self, pin: &str, id: ConnectionId) -> bool {
        if !self.track_membership(pin, id) {
            return false;
        }
        self.rooms
            .entry(pin.to_owned())
            .or_default()
            .members
            .insert(id);
        true
    }

    /// Remove a connection from the room of `pin` without closing it.
    pub fn leave_room(&self, pin: &str, id: &ConnectionId) {
        if let Some(mut room) = self.rooms.get_mut(pin) {
            room.members.shift_remove(id);
        }
        if let Some(mut entry) = self.connections.get_mut(id) {
            entry.rooms.shift_remove(pin);
        }
    }

    /// Drop the room of `pin`; its members stay connected.
    pub fn close_room(&self, pin: &str) {
        let Some((_, room)) = self.rooms.remove(pin) else {
            return;
        };
        for member in room.members {
            if let Some(mut entry) = self.connections.get_mut(&member) {
                entry.rooms.shift_remove(pin);
            }
        }
    }

    /// Deliver `event` to an audience of the room of `pin`; returns how many
    /// connections accepted the frame.
    pub fn publish(&self, pin: &str, audience: Audience, event: &ServerEvent) -> usize {
        let recipients: Vec<ConnectionId> = match self.rooms.get(pin) {
            Some(room) => match audience {
                Audience::Room => room.members.iter().copied().collect(),
                Audience::Host => room.host.into_iter().collect(),
            },
            None => {
                debug!(pin, event = event.name(), "no room to publish to");
                return 0;
            }
        };

        recipients
            .iter()
            .filter(|id| self.send_to(id, event))
            .count()
    }

    /// Deliver `event` to a single connection.
    pub fn send_to(&self, id: &ConnectionId, event: &ServerEvent) -> bool {
        let Some(connection) = self
            .connections
            .get(id)
            .map(|entry| entry.connection.clone())
        else {
            return false;
        };

        let delivered = connection.send(event);
        if !delivered {
            warn!(connection = %id, event = event.name(), "writer closed; event dropped");
        }
        delivered
    }

    /// Connections currently in the room of `pin`, host included.
    pub fn members(&self, pin: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(pin)
            .map(|room| room.members.iter().copied().collect())
            .unwrap_or_default()
    }

    fn track_membership(&self, pin: &str, id: ConnectionId) -> bool {
        match self.connections.get_mut(&id) {
            Some(mut entry) => {
                entry.rooms.insert(pin.to_owned());
                true
            }
            None => {
                debug!(pin, connection = %id, "ignoring room membership for unknown connection");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn connect(dispatcher: &BroadcastDispatcher) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        dispatcher.register(Connection::new(id, tx));
        (id, rx)
    }

    fn events(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            let value: Value = serde_json::from_str(text.as_str()).unwrap();
            names.push(value["event"].as_str().unwrap().to_string());
        }
        names
    }

    fn event(name: &'static str) -> ServerEvent {
        ServerEvent::json(name, &json!({})).unwrap()
    }

    #[test]
    fn host_audience_only_reaches_the_host() {
        let dispatcher = BroadcastDispatcher::new();
        let (host, mut host_rx) = connect(&dispatcher);
        let (player, mut player_rx) = connect(&dispatcher);
        dispatcher.attach_host("123456", host);
        dispatcher.join_room("123456", player);

        assert_eq!(dispatcher.publish("123456", Audience::Host, &event("answer_stats")), 1);
        assert_eq!(dispatcher.publish("123456", Audience::Room, &event("new_question")), 2);

        assert_eq!(events(&mut host_rx), vec!["answer_stats", "new_question"]);
        assert_eq!(events(&mut player_rx), vec!["new_question"]);
    }

    #[test]
    fn rooms_are_isolated_by_join_code() {
        let dispatcher = BroadcastDispatcher::new();
        let (a, mut a_rx) = connect(&dispatcher);
        let (b, mut b_rx) = connect(&dispatcher);
        dispatcher.attach_host("111111", a);
        dispatcher.attach_host("222222", b);

        dispatcher.publish("111111", Audience::Room, &event("game_started"));

        assert_eq!(events(&mut a_rx), vec!["game_started"]);
        assert!(events(&mut b_rx).is_empty());
    }

    #[test]
    fn unregistered_connection_receives_nothing() {
        let dispatcher = BroadcastDispatcher::new();
        let (host, _host_rx) = connect(&dispatcher);
        let (player, mut player_rx) = connect(&dispatcher);
        dispatcher.attach_host("123456", host);
        dispatcher.join_room("123456", player);

        assert_eq!(dispatcher.unregister(&player), vec!["123456".to_string()]);
        assert!(!dispatcher.send_to(&player, &event("error")));
        assert_eq!(dispatcher.publish("123456", Audience::Room, &event("host_left")), 1);
        assert!(events(&mut player_rx).is_empty());
        assert_eq!(dispatcher.members("123456"), vec![host]);
    }

    #[test]
    fn close_room_forgets_membership() {
        let dispatcher = BroadcastDispatcher::new();
        let (host, _rx) = connect(&dispatcher);
        dispatcher.attach_host("123456", host);

        dispatcher.close_room("123456");
        assert_eq!(dispatcher.publish("123456", Audience::Room, &event("game_over")), 0);
        assert!(dispatcher.unregister(&host).is_empty());
    }

    #[test]
    fn membership_requires_a_registered_connection() {
        let dispatcher = BroadcastDispatcher::new();
        assert!(!dispatcher.join_room("123456", Uuid::new_v4()));
        assert!(dispatcher.members("123456").is_empty());
    }
}
