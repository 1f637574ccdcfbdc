use indexmap::IndexMap;
use thiserror::Error;

use crate::state::{dispatcher::ConnectionId, game::Player};

/// Reasons a join request is refused by the roster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("the name `{0}` is already taken")]
    DuplicateName(String),
    #[error("this connection already joined the game")]
    AlreadyJoined,
}

/// Players of one session in join order.
#[derive(Debug, Default)]
pub struct PlayerRoster {
    players: IndexMap<ConnectionId, Player>,
}

impl PlayerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player. Names are compared verbatim (case-sensitive).
    pub fn join(
        &mut self,
        connection: ConnectionId,
        username: String,
    ) -> Result<&Player, RosterError> {
        if self.players.contains_key(&connection) {
            return Err(RosterError::AlreadyJoined);
        }
        if self
            .players
            .values()
            .any(|player| player.username == username)
        {
            return Err(RosterError::DuplicateName(username));
        }

        let entry = self
            .players
            .entry(connection)
            .or_insert_with(|| Player::new(connection, username));
        Ok(entry)
    }

    /// Remove the player joined from `connection`, keeping the order of the others.
    pub fn leave(&mut self, connection: &ConnectionId) -> Option<Player> {
        self.players.shift_remove(connection)
    }

    pub fn get(&self, connection: &ConnectionId) -> Option<&Player> {
        self.players.get(connection)
    }

    pub fn get_mut(&mut self, connection: &ConnectionId) -> Option<&mut Player> {
        self.players.get_mut(connection)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Players by descending score. The sort is stable so ties keep join order.
    pub fn ranked(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn duplicate_names_are_rejected_case_sensitively() {
        let mut roster = PlayerRoster::new();
        roster.join(Uuid::new_v4(), "Alice".into()).unwrap();

        let err = roster.join(Uuid::new_v4(), "Alice".into()).unwrap_err();
        assert_eq!(err, RosterError::DuplicateName("Alice".into()));
        assert!(roster.join(Uuid::new_v4(), "alice".into()).is_ok());
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn a_connection_joins_only_once() {
        let mut roster = PlayerRoster::new();
        let connection = Uuid::new_v4();
        roster.join(connection, "Alice".into()).unwrap();
        assert_eq!(
            roster.join(connection, "Bob".into()).unwrap_err(),
            RosterError::AlreadyJoined
        );
    }

    #[test]
    fn leave_keeps_remaining_order_and_ignores_strangers() {
        let mut roster = PlayerRoster::new();
        let ids: Vec<ConnectionId> = (0..3).map(|_| Uuid::new_v4()).collect();
        for (id, name) in ids.iter().zip(["A", "B", "C"]) {
            roster.join(*id, name.into()).unwrap();
        }

        assert!(roster.leave(&Uuid::new_v4()).is_none());
        assert_eq!(roster.leave(&ids[1]).unwrap().username, "B");

        let names: Vec<&str> = roster.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn ranking_is_descending_and_stable_on_ties() {
        let mut roster = PlayerRoster::new();
        let ids: Vec<ConnectionId> = (0..4).map(|_| Uuid::new_v4()).collect();
        for (id, name) in ids.iter().zip(["A", "B", "C", "D"]) {
            roster.join(*id, name.into()).unwrap();
        }
        roster.get_mut(&ids[0]).unwrap().score = 500;
        roster.get_mut(&ids[1]).unwrap().score = 1200;
        roster.get_mut(&ids[2]).unwrap().score = 500;
        roster.get_mut(&ids[3]).unwrap().score = 0;

        let names: Vec<&str> = roster
            .ranked()
            .into_iter()
            .map(|p| p.username.as_str())
            .collect();
        assert_eq!(names, vec!["B", "A", "C", "D"]);
    }
}
