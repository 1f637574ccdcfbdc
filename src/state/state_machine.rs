use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Lifecycle phases of one live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for players; the host has not started yet.
    Lobby,
    /// Game started; the first question is about to be shown.
    Starting,
    /// A question is on screen and answers are accepted.
    QuestionActive,
    /// Intermediate scoreboard between two rounds.
    ShowingScores,
    /// Final scoreboard; the session waits to be saved.
    GameOver,
    /// The game record was stored and the session is closed.
    Finalized,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Host starts the game from the lobby.
    Start,
    /// A question goes live (first one after the countdown, others after the scoreboard).
    OpenQuestion,
    /// Host closes the current question.
    Advance,
    /// No question remains after the scoreboard.
    Finish,
    /// The game record was persisted.
    Finalize,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    #[error("a transition is already pending")]
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    #[error(transparent)]
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// No transition is currently pending.
    #[error("no transition is pending")]
    NoPending,
    /// Plan ID does not match the pending plan.
    #[error("pending transition {expected} does not match {got}")]
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    #[error("phase changed during transition (expected {expected:?}, got {actual:?})")]
    PhaseMismatch {
        /// Phase when plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortError {
    /// No transition is currently pending.
    #[error("no transition is pending")]
    NoPending,
    /// Plan ID does not match the pending plan.
    #[error("pending transition {expected} does not match {got}")]
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: SessionPhase,
    /// Phase the state machine will transition to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: SessionPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<SessionPhase>,
}

/// Per-session lifecycle state machine.
///
/// Immediate transitions go through [`SessionStateMachine::transition`]. Transitions that
/// depend on asynchronous work (storing the game record) are planned first, then applied
/// or aborted once the work completes, so a second request cannot start the same work.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Lobby,
            version: 0,
            pending: None,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan and immediately apply a transition.
    pub fn transition(&mut self, event: SessionEvent) -> Result<SessionPhase, PlanError> {
        let plan = self.plan(event)?;
        self.phase = plan.to;
        self.version += 1;
        self.pending = None;
        Ok(self.phase)
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        self.phase = plan.to;
        self.version += 1;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Lobby, SessionEvent::Start) => SessionPhase::Starting,
            (SessionPhase::Starting, SessionEvent::OpenQuestion) => SessionPhase::QuestionActive,
            (SessionPhase::QuestionActive, SessionEvent::Advance) => SessionPhase::ShowingScores,
            (SessionPhase::ShowingScores, SessionEvent::OpenQuestion) => {
                SessionPhase::QuestionActive
            }
            (SessionPhase::ShowingScores, SessionEvent::Finish) => SessionPhase::GameOver,
            (SessionPhase::GameOver, SessionEvent::Finalize) => SessionPhase::Finalized,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_lobby() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), SessionPhase::Lobby);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(
            sm.transition(SessionEvent::Start).unwrap(),
            SessionPhase::Starting
        );
        assert_eq!(
            sm.transition(SessionEvent::OpenQuestion).unwrap(),
            SessionPhase::QuestionActive
        );
        assert_eq!(
            sm.transition(SessionEvent::Advance).unwrap(),
            SessionPhase::ShowingScores
        );
        assert_eq!(
            sm.transition(SessionEvent::OpenQuestion).unwrap(),
            SessionPhase::QuestionActive
        );
        assert_eq!(
            sm.transition(SessionEvent::Advance).unwrap(),
            SessionPhase::ShowingScores
        );
        assert_eq!(
            sm.transition(SessionEvent::Finish).unwrap(),
            SessionPhase::GameOver
        );

        let plan = sm.plan(SessionEvent::Finalize).unwrap();
        assert_eq!(sm.apply(plan.id).unwrap(), SessionPhase::Finalized);
        assert_eq!(sm.version(), 7);
    }

    #[test]
    fn double_start_is_an_invalid_transition() {
        let mut sm = SessionStateMachine::new();
        sm.transition(SessionEvent::Start).unwrap();

        let err = sm.transition(SessionEvent::Start).unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidTransition(InvalidTransition {
                from: SessionPhase::Starting,
                event: SessionEvent::Start,
            })
        );
        assert_eq!(sm.phase(), SessionPhase::Starting);
    }

    #[test]
    fn advance_is_only_valid_while_a_question_is_active() {
        let mut sm = SessionStateMachine::new();
        assert!(sm.transition(SessionEvent::Advance).is_err());
        sm.transition(SessionEvent::Start).unwrap();
        assert!(sm.transition(SessionEvent::Advance).is_err());
    }

    #[test]
    fn pending_finalize_blocks_a_second_plan() {
        let mut sm = SessionStateMachine::new();
        for event in [
            SessionEvent::Start,
            SessionEvent::OpenQuestion,
            SessionEvent::Advance,
            SessionEvent::Finish,
        ] {
            sm.transition(event).unwrap();
        }

        let plan = sm.plan(SessionEvent::Finalize).unwrap();
        assert_eq!(sm.snapshot().pending, Some(SessionPhase::Finalized));
        assert_eq!(
            sm.plan(SessionEvent::Finalize).unwrap_err(),
            PlanError::AlreadyPending
        );

        sm.abort(plan.id).unwrap();
        assert_eq!(sm.phase(), SessionPhase::GameOver);
        assert!(sm.snapshot().pending.is_none());
        assert!(sm.plan(SessionEvent::Finalize).is_ok());
    }

    #[test]
    fn apply_with_foreign_plan_id_keeps_pending() {
        let mut sm = SessionStateMachine::new();
        let plan = sm.plan(SessionEvent::Start).unwrap();

        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));
        assert_eq!(sm.apply(plan.id).unwrap(), SessionPhase::Starting);
    }
}
