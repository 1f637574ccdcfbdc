//! Process-wide table of live sessions keyed by join code.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use rand::Rng;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::state::session::GameSession;

/// Shared handle to one session. Handlers lock it for the duration of a request.
pub type SessionHandle = Arc<Mutex<GameSession>>;

/// Number of distinct 6-digit join codes.
pub const JOIN_CODE_SPACE: usize = 900_000;
/// Candidate codes drawn before giving up on a crowded table.
const MAX_CODE_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no free join code is available")]
    CodeSpaceExhausted,
}

struct SessionEntry {
    id: Uuid,
    handle: SessionHandle,
}

type CodeGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// Live sessions. Holds no game logic; only creation, lookup and teardown.
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
    generator: CodeGenerator,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Registry issuing random codes in `100000..=999999`.
    pub fn new() -> Self {
        Self::with_generator(|| rand::rng().random_range(100_000..1_000_000).to_string())
    }

    /// Registry drawing candidate codes from `generator`.
    pub fn with_generator(generator: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            sessions: DashMap::new(),
            generator: Box::new(generator),
        }
    }

    /// Register a new session under a code that no live session uses.
    ///
    /// `build` receives the reserved code and runs while the code's slot is locked, so it must
    /// not call back into the registry. Two concurrent creations never get the same code.
    pub fn create(
        &self,
        build: impl FnOnce(String) -> GameSession,
    ) -> Result<(String, SessionHandle), RegistryError> {
        if self.sessions.len() >= JOIN_CODE_SPACE {
            return Err(RegistryError::CodeSpaceExhausted);
        }

        for attempt in 0..MAX_CODE_ATTEMPTS {
            let code = (self.generator)();
            match self.sessions.entry(code.clone()) {
                Entry::Occupied(_) => {
                    debug!(pin = %code, attempt, "join code collision, drawing again");
                }
                Entry::Vacant(slot) => {
                    let session = build(code.clone());
                    let id = session.id();
                    let handle = Arc::new(Mutex::new(session));
                    slot.insert(SessionEntry {
                        id,
                        handle: handle.clone(),
                    });
                    return Ok((code, handle));
                }
            }
        }

        Err(RegistryError::CodeSpaceExhausted)
    }

    pub fn lookup(&self, pin: &str) -> Option<SessionHandle> {
        self.sessions.get(pin).map(|entry| entry.handle.clone())
    }

    /// Drop the session of `pin`. Safe to call more than once.
    pub fn remove(&self, pin: &str) -> Option<SessionHandle> {
        self.sessions.remove(pin).map(|(_, entry)| entry.handle)
    }

    /// Drop the session of `pin` only if it is still the instance `id`.
    pub fn remove_if_same(&self, pin: &str, id: Uuid) -> Option<SessionHandle> {
        self.sessions
            .remove_if(pin, |_, entry| entry.id == id)
            .map(|(_, entry)| entry.handle)
    }

    /// Whether `pin` still maps to the session instance `id`.
    pub fn is_current(&self, pin: &str, id: Uuid) -> bool {
        self.sessions.get(pin).is_some_and(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn build(pin: String) -> GameSession {
        GameSession::new(pin, "Quiz".into(), None, Vec::new(), Uuid::new_v4())
    }

    #[test]
    fn collision_draws_a_new_code() {
        let calls = AtomicUsize::new(0);
        let registry = SessionRegistry::with_generator(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 { "123456".into() } else { "654321".into() }
        });

        let (first, _) = registry.create(build).unwrap();
        let (second, handle) = registry.create(build).unwrap();

        assert_eq!(first, "123456");
        assert_eq!(second, "654321");
        assert_eq!(registry.len(), 2);
        assert_eq!(handle.try_lock().unwrap().pin(), "654321");
    }

    #[test]
    fn full_table_reports_exhaustion() {
        let registry = SessionRegistry::with_generator(|| "123456".into());
        registry.create(build).unwrap();

        assert_eq!(
            registry.create(build).unwrap_err(),
            RegistryError::CodeSpaceExhausted
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_is_idempotent_and_instance_aware() {
        let registry = SessionRegistry::with_generator(|| "123456".into());
        let (pin, handle) = registry.create(build).unwrap();
        let id = handle.try_lock().unwrap().id();

        assert!(registry.is_current(&pin, id));
        assert!(registry.remove_if_same(&pin, Uuid::new_v4()).is_none());
        assert!(registry.lookup(&pin).is_some());

        assert!(registry.remove(&pin).is_some());
        assert!(registry.remove(&pin).is_none());
        assert!(registry.lookup(&pin).is_none());
        assert!(!registry.is_current(&pin, id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creations_get_distinct_codes() {
        let registry = Arc::new(SessionRegistry::new());
        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.create(build).map(|(pin, _)| pin) })
            })
            .collect();

        let mut pins = HashSet::new();
        for task in tasks {
            pins.insert(task.await.unwrap().unwrap());
        }
        assert_eq!(pins.len(), 64);
        assert_eq!(registry.len(), 64);
        assert!(pins.iter().all(|pin| pin.len() == 6));
    }
}
