//! One live quiz session: its questions, players, answers and lifecycle.

use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::state::{
    answers::{AnswerAggregator, AnswerTally},
    dispatcher::ConnectionId,
    game::{
        AnswerRecord, FinalScoreEntry, GameRecord, OPTION_COUNT, Player, PlayerAnswerDetail,
        Question, QuestionDetail, Standing,
    },
    roster::{PlayerRoster, RosterError},
    scheduler::ScheduledTask,
    scoring::score_answer,
    state_machine::{
        AbortError, ApplyError, InvalidTransition, PlanError, PlanId, SessionEvent,
        SessionPhase, SessionStateMachine,
    },
};

/// Reasons a session refuses a request.
///
/// Some of them only mean the request was late or duplicated; see [`SessionError::is_silent`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("the name `{0}` is already taken")]
    DuplicateName(String),
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("this connection already joined the game")]
    AlreadyJoined,
    #[error("the host cannot join its own game as a player")]
    HostCannotJoin,
    #[error("only the host can do that")]
    NotHost,
    #[error("option {0} does not exist")]
    InvalidOption(usize),
    #[error("the game cannot start without players")]
    EmptyRoster,
    #[error("connection is not a player of this game")]
    UnknownPlayer,
    #[error("answer already recorded for this question")]
    AlreadyAnswered,
    #[error("no question is accepting answers")]
    StaleAnswer,
    #[error(transparent)]
    Transition(#[from] PlanError),
}

impl SessionError {
    /// Errors caused by late or repeated requests. They are dropped without telling the client.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            Self::EmptyRoster
                | Self::UnknownPlayer
                | Self::AlreadyAnswered
                | Self::StaleAnswer
                | Self::Transition(_)
        )
    }
}

impl From<RosterError> for SessionError {
    fn from(value: RosterError) -> Self {
        match value {
            RosterError::DuplicateName(name) => Self::DuplicateName(name),
            RosterError::AlreadyJoined => Self::AlreadyJoined,
        }
    }
}

/// Question that just went live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedQuestion {
    /// 1-based position.
    pub number: usize,
    pub total: usize,
    pub question: Question,
}

/// What follows the scoreboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    Next(OpenedQuestion),
    GameOver(Vec<FinalScoreEntry>),
}

/// Private result of a scored answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub points: u32,
    pub new_score: u32,
    /// Set when the answer was wrong.
    pub correct_index: Option<usize>,
}

/// Everything produced by an accepted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub feedback: AnswerFeedback,
    pub tally: AnswerTally,
    pub total_players: usize,
}

/// State of a single live session.
///
/// Every method runs under the session lock held by the caller, so each request is applied
/// atomically with respect to the others targeting the same session.
#[derive(Debug)]
pub struct GameSession {
    id: Uuid,
    pin: String,
    quiz_title: String,
    quiz_id: Option<String>,
    questions: Vec<Question>,
    host: ConnectionId,
    machine: SessionStateMachine,
    /// `None` while in the lobby or the start countdown.
    current_question: Option<usize>,
    started_at: Option<SystemTime>,
    roster: PlayerRoster,
    answers: AnswerAggregator,
    details: Vec<QuestionDetail>,
    pending_task: Option<ScheduledTask>,
}

impl GameSession {
    pub fn new(
        pin: String,
        quiz_title: String,
        quiz_id: Option<String>,
        questions: Vec<Question>,
        host: ConnectionId,
    ) -> Self {
        let answers = AnswerAggregator::new(questions.len());
        Self {
            id: Uuid::new_v4(),
            pin,
            quiz_title,
            quiz_id,
            questions,
            host,
            machine: SessionStateMachine::new(),
            current_question: None,
            started_at: None,
            roster: PlayerRoster::new(),
            answers,
            details: Vec::new(),
            pending_task: None,
        }
    }

    /// Identity of this session instance. A join code can be reused by a later session; the
    /// id cannot.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn quiz_title(&self) -> &str {
        &self.quiz_title
    }

    pub fn host(&self) -> ConnectionId {
        self.host
    }

    pub fn is_host(&self, connection: &ConnectionId) -> bool {
        self.host == *connection
    }

    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Number of transitions applied so far; deferred work compares it before acting.
    pub fn version(&self) -> usize {
        self.machine.version()
    }

    pub fn current_question(&self) -> Option<usize> {
        self.current_question
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn roster(&self) -> &PlayerRoster {
        &self.roster
    }

    /// Add a player. Only possible in the lobby.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        username: String,
    ) -> Result<&Player, SessionError> {
        if self.phase() != SessionPhase::Lobby {
            return Err(SessionError::AlreadyStarted);
        }
        if self.is_host(&connection) {
            return Err(SessionError::HostCannotJoin);
        }
        Ok(self.roster.join(connection, username)?)
    }

    /// Remove a player and the answers they gave. Returns `None` for non-players.
    ///
    /// Answers already copied to the question details stay there.
    pub fn leave(&mut self, connection: &ConnectionId) -> Option<Player> {
        let player = self.roster.leave(connection)?;
        self.answers.forget(connection);
        Some(player)
    }

    /// Leave the lobby. Records the start time and snapshots every question for the record.
    pub fn start(&mut self, requester: &ConnectionId, now: SystemTime) -> Result<(), SessionError> {
        self.ensure_host(requester)?;
        if self.phase() == SessionPhase::Lobby && self.roster.is_empty() {
            return Err(SessionError::EmptyRoster);
        }
        self.machine.transition(SessionEvent::Start)?;

        self.started_at = Some(now);
        self.details = self
            .questions
            .iter()
            .map(|question| QuestionDetail {
                question: question.clone(),
                player_answers: Vec::new(),
            })
            .collect();
        Ok(())
    }

    /// Put the next question on screen, after the start countdown or a scoreboard.
    pub fn open_next_question(&mut self) -> Result<OpenedQuestion, SessionError> {
        let index = self.next_question_index();
        if index >= self.questions.len() {
            return Err(PlanError::InvalidTransition(InvalidTransition {
                from: self.phase(),
                event: SessionEvent::OpenQuestion,
            })
            .into());
        }
        self.machine.transition(SessionEvent::OpenQuestion)?;

        self.current_question = Some(index);
        self.answers.reset(index);
        Ok(OpenedQuestion {
            number: index + 1,
            total: self.questions.len(),
            question: self.questions[index].clone(),
        })
    }

    /// Close the active question and return the intermediate scoreboard.
    pub fn advance(&mut self, requester: &ConnectionId) -> Result<Vec<Standing>, SessionError> {
        self.ensure_host(requester)?;
        self.machine.transition(SessionEvent::Advance)?;
        Ok(self.standings())
    }

    /// Leave the scoreboard: open the next question, or end the game after the last one.
    pub fn conclude_round(&mut self) -> Result<RoundOutcome, SessionError> {
        if self.phase() == SessionPhase::ShowingScores
            && self.next_question_index() >= self.questions.len()
        {
            self.machine.transition(SessionEvent::Finish)?;
            return Ok(RoundOutcome::GameOver(self.final_scores()));
        }
        self.open_next_question().map(RoundOutcome::Next)
    }

    /// Score an answer to the active question.
    pub fn submit_answer(
        &mut self,
        connection: ConnectionId,
        option_index: usize,
        time_remaining: f64,
    ) -> Result<AnswerOutcome, SessionError> {
        if self.roster.get(&connection).is_none() {
            return Err(SessionError::UnknownPlayer);
        }
        let question_index = match (self.phase(), self.current_question) {
            (SessionPhase::QuestionActive, Some(index)) => index,
            _ => return Err(SessionError::StaleAnswer),
        };
        if self.answers.has_answered(question_index, &connection) {
            return Err(SessionError::AlreadyAnswered);
        }
        if option_index >= OPTION_COUNT {
            return Err(SessionError::InvalidOption(option_index));
        }

        let correct_index = self.questions[question_index].correct_index();
        let correct = option_index == correct_index;
        let points = score_answer(correct, time_remaining);

        let Some(player) = self.roster.get_mut(&connection) else {
            return Err(SessionError::UnknownPlayer);
        };
        if correct {
            player.score = player.score.saturating_add(points);
            player.correct_answers = player.correct_answers.saturating_add(1);
        }
        let new_score = player.score;
        let username = player.username.clone();

        self.answers.record(
            question_index,
            AnswerRecord {
                connection,
                option_index,
                time_remaining,
                correct,
                points,
            },
        );
        if let Some(detail) = self.details.get_mut(question_index) {
            detail.player_answers.push(PlayerAnswerDetail {
                username,
                answer_index: Some(option_index),
                time_left: time_remaining,
                is_correct: correct,
                points_earned: points,
            });
        }

        Ok(AnswerOutcome {
            feedback: AnswerFeedback {
                correct,
                points,
                new_score,
                correct_index: (!correct).then_some(correct_index),
            },
            tally: self.answers.tally(question_index),
            total_players: self.roster.len(),
        })
    }

    /// Players by descending score.
    pub fn standings(&self) -> Vec<Standing> {
        self.roster
            .ranked()
            .into_iter()
            .map(|player| Standing {
                username: player.username.clone(),
                score: player.score,
            })
            .collect()
    }

    /// Final ranking. Ranks are 1-based positions; equal scores keep join order.
    pub fn final_scores(&self) -> Vec<FinalScoreEntry> {
        let total_questions = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        self.roster
            .ranked()
            .into_iter()
            .enumerate()
            .map(|(position, player)| FinalScoreEntry {
                username: player.username.clone(),
                score: player.score,
                rank: u32::try_from(position + 1).unwrap_or(u32::MAX),
                correct_answers: player.correct_answers,
                total_questions,
            })
            .collect()
    }

    /// Reserve the save of the game record. Fails while another save is in flight.
    pub fn plan_finalize(&mut self, requester: &ConnectionId) -> Result<PlanId, SessionError> {
        self.ensure_host(requester)?;
        Ok(self.machine.plan(SessionEvent::Finalize)?.id)
    }

    pub fn apply_finalize(&mut self, plan: PlanId) -> Result<SessionPhase, ApplyError> {
        self.machine.apply(plan)
    }

    /// Release a failed save so the host can retry.
    pub fn abort_finalize(&mut self, plan: PlanId) -> Result<(), AbortError> {
        self.machine.abort(plan)
    }

    /// Build the record handed to the store.
    ///
    /// Players still in the room who skipped a question get an unanswered entry for it.
    pub fn game_record(&self, finished_at: SystemTime) -> GameRecord {
        let questions = self
            .details
            .iter()
            .map(|detail| {
                let mut detail = detail.clone();
                for player in self.roster.iter() {
                    let answered = detail
                        .player_answers
                        .iter()
                        .any(|answer| answer.username == player.username);
                    if !answered {
                        detail
                            .player_answers
                            .push(PlayerAnswerDetail::unanswered(player.username.clone()));
                    }
                }
                detail
            })
            .collect();

        GameRecord {
            id: Uuid::new_v4(),
            pin: self.pin.clone(),
            quiz_title: self.quiz_title.clone(),
            quiz_id: self.quiz_id.clone(),
            started_at: self.started_at.unwrap_or(finished_at),
            finished_at,
            total_players: u32::try_from(self.roster.len()).unwrap_or(u32::MAX),
            questions,
            final_scores: self.final_scores(),
        }
    }

    /// Keep `task` as the session's deferred step, cancelling the previous one.
    pub fn set_pending_task(&mut self, task: ScheduledTask) {
        if let Some(previous) = self.pending_task.replace(task) {
            previous.cancel();
        }
    }

    /// Cancel deferred work. Called when the session is torn down.
    pub fn close(&mut self) {
        if let Some(task) = self.pending_task.take() {
            task.cancel();
        }
    }

    fn next_question_index(&self) -> usize {
        self.current_question.map_or(0, |index| index + 1)
    }

    fn ensure_host(&self, requester: &ConnectionId) -> Result<(), SessionError> {
        if self.is_host(requester) {
            Ok(())
        } else {
            Err(SessionError::NotHost)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn question(text: &str) -> Question {
        Question::new(
            text,
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            1,
            20,
        )
        .unwrap()
    }

    fn session(questions: usize) -> (GameSession, ConnectionId) {
        let host = Uuid::new_v4();
        let questions = (0..questions).map(|i| question(&format!("Q{i}"))).collect();
        (
            GameSession::new("123456".into(), "Quiz".into(), None, questions, host),
            host,
        )
    }

    fn started(questions: usize, players: &[&str]) -> (GameSession, ConnectionId, Vec<ConnectionId>) {
        let (mut session, host) = session(questions);
        let ids: Vec<ConnectionId> = players
            .iter()
            .map(|name| {
                let id = Uuid::new_v4();
                session.join(id, (*name).into()).unwrap();
                id
            })
            .collect();
        session.start(&host, SystemTime::now()).unwrap();
        session.open_next_question().unwrap();
        (session, host, ids)
    }

    #[test]
    fn start_with_empty_roster_stays_in_lobby() {
        let (mut session, host) = session(2);
        assert_eq!(
            session.start(&host, SystemTime::now()).unwrap_err(),
            SessionError::EmptyRoster
        );
        assert_eq!(session.phase(), SessionPhase::Lobby);
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn only_the_host_drives_the_session() {
        let (mut session, _host) = session(1);
        let player = Uuid::new_v4();
        session.join(player, "Alice".into()).unwrap();
        assert_eq!(
            session.start(&player, SystemTime::now()).unwrap_err(),
            SessionError::NotHost
        );
        assert_eq!(session.phase(), SessionPhase::Lobby);
    }

    #[test]
    fn join_after_start_is_refused() {
        let (mut session, _host, _ids) = started(1, &["Alice"]);
        assert_eq!(
            session.join(Uuid::new_v4(), "Bob".into()).unwrap_err(),
            SessionError::AlreadyStarted
        );
    }

    #[test]
    fn second_start_is_silently_ignored() {
        let (mut session, host) = session(1);
        session.join(Uuid::new_v4(), "Alice".into()).unwrap();
        session.start(&host, SystemTime::now()).unwrap();

        let err = session.start(&host, SystemTime::now()).unwrap_err();
        assert!(err.is_silent());
        assert_eq!(session.phase(), SessionPhase::Starting);
    }

    #[test]
    fn answers_are_scored_once_per_question() {
        let (mut session, _host, ids) = started(2, &["Alice", "Bob"]);

        let alice = session.submit_answer(ids[0], 1, 18.0).unwrap();
        assert_eq!(
            alice.feedback,
            AnswerFeedback {
                correct: true,
                points: 1180,
                new_score: 1180,
                correct_index: None,
            }
        );

        let bob = session.submit_answer(ids[1], 0, 12.0).unwrap();
        assert_eq!(bob.feedback.points, 0);
        assert_eq!(bob.feedback.correct_index, Some(1));
        assert_eq!(bob.tally.counts, [1, 1, 0, 0]);
        assert_eq!(bob.total_players, 2);

        assert_eq!(
            session.submit_answer(ids[0], 1, 19.0).unwrap_err(),
            SessionError::AlreadyAnswered
        );
        let scores = session.standings();
        assert_eq!(scores[0].score, 1180);
        assert_eq!(scores[1].score, 0);
        assert_eq!(session.answers.tally(0).total_answered, 2);
        assert_eq!(session.answers.tally(0).counts, [1, 1, 0, 0]);

        let record = session.game_record(SystemTime::now());
        let alice_entries: Vec<_> = record.questions[0]
            .player_answers
            .iter()
            .filter(|answer| answer.username == "Alice")
            .collect();
        assert_eq!(alice_entries.len(), 1);
        assert_eq!(alice_entries[0].points_earned, 1180);
    }

    #[test]
    fn huge_time_left_cannot_overflow_a_score() {
        let (mut session, host, ids) = started(2, &["Alice"]);
        let first = session.submit_answer(ids[0], 1, 1e12).unwrap();
        assert_eq!(first.feedback.new_score, u32::MAX);

        session.advance(&host).unwrap();
        session.conclude_round().unwrap();
        let second = session.submit_answer(ids[0], 1, 1e12).unwrap();
        assert_eq!(second.feedback.new_score, u32::MAX);
        assert_eq!(session.standings()[0].score, u32::MAX);
    }

    #[test]
    fn host_cannot_join_as_a_player() {
        let (mut session, host) = session(1);
        assert_eq!(
            session.join(host, "Host".into()).unwrap_err(),
            SessionError::HostCannotJoin
        );
        assert!(session.roster().is_empty());
    }

    #[test]
    fn answers_outside_an_active_question_are_stale() {
        let (mut session, host, ids) = started(2, &["Alice"]);
        session.advance(&host).unwrap();

        let err = session.submit_answer(ids[0], 1, 10.0).unwrap_err();
        assert_eq!(err, SessionError::StaleAnswer);
        assert!(err.is_silent());
    }

    #[test]
    fn unknown_connections_and_bad_options_are_refused() {
        let (mut session, host, ids) = started(1, &["Alice"]);
        assert_eq!(
            session.submit_answer(host, 1, 10.0).unwrap_err(),
            SessionError::UnknownPlayer
        );
        assert_eq!(
            session.submit_answer(ids[0], 4, 10.0).unwrap_err(),
            SessionError::InvalidOption(4)
        );
        assert_eq!(session.submit_answer(ids[0], 1, 10.0).unwrap().tally.total_answered, 1);
    }

    #[test]
    fn rounds_run_until_game_over() {
        let (mut session, host, ids) = started(2, &["Alice", "Bob"]);
        session.submit_answer(ids[1], 1, 5.0).unwrap();

        let standings = session.advance(&host).unwrap();
        assert_eq!(standings[0].username, "Bob");
        assert!(session.advance(&host).unwrap_err().is_silent());

        let RoundOutcome::Next(next) = session.conclude_round().unwrap() else {
            panic!("expected a second question");
        };
        assert_eq!((next.number, next.total), (2, 2));
        assert_eq!(session.phase(), SessionPhase::QuestionActive);

        session.advance(&host).unwrap();
        let RoundOutcome::GameOver(scores) = session.conclude_round().unwrap() else {
            panic!("expected game over");
        };
        assert_eq!(session.phase(), SessionPhase::GameOver);
        assert_eq!(scores[0].username, "Bob");
        assert_eq!(scores[0].rank, 1);
        assert_eq!(scores[0].correct_answers, 1);
        assert_eq!(scores[1].rank, 2);
        assert_eq!(scores[1].total_questions, 2);
    }

    #[test]
    fn leaving_player_is_dropped_from_the_tally() {
        let (mut session, _host, ids) = started(1, &["Alice", "Bob"]);
        session.submit_answer(ids[0], 1, 5.0).unwrap();

        assert_eq!(session.leave(&ids[0]).unwrap().username, "Alice");
        assert!(session.leave(&ids[0]).is_none());

        let outcome = session.submit_answer(ids[1], 2, 5.0).unwrap();
        assert_eq!(outcome.tally.total_answered, 1);
        assert_eq!(outcome.total_players, 1);
    }

    #[test]
    fn record_fills_in_unanswered_questions() {
        let (mut session, host, ids) = started(2, &["Alice", "Bob"]);
        session.submit_answer(ids[0], 1, 18.0).unwrap();
        session.advance(&host).unwrap();
        session.conclude_round().unwrap();
        session.advance(&host).unwrap();
        session.conclude_round().unwrap();

        let finished_at = SystemTime::now() + Duration::from_secs(60);
        let record = session.game_record(finished_at);

        assert_eq!(record.total_players, 2);
        assert_eq!(record.finished_at, finished_at);
        assert_eq!(record.questions.len(), 2);
        for detail in &record.questions {
            assert_eq!(detail.player_answers.len(), 2);
        }
        let bob_first = &record.questions[0].player_answers[1];
        assert_eq!(bob_first.username, "Bob");
        assert_eq!(bob_first.answer_index, None);
        assert_eq!(record.final_scores[0].username, "Alice");
    }

    #[test]
    fn failed_save_can_be_retried() {
        let (mut session, host, _ids) = started(1, &["Alice"]);
        session.advance(&host).unwrap();
        session.conclude_round().unwrap();

        let plan = session.plan_finalize(&host).unwrap();
        assert!(session.plan_finalize(&host).unwrap_err().is_silent());
        session.abort_finalize(plan).unwrap();
        assert_eq!(session.phase(), SessionPhase::GameOver);

        let retry = session.plan_finalize(&host).unwrap();
        assert_eq!(session.apply_finalize(retry).unwrap(), SessionPhase::Finalized);
    }

    #[test]
    fn finalize_before_game_over_is_ignored() {
        let (mut session, host, _ids) = started(1, &["Alice"]);
        assert!(session.plan_finalize(&host).unwrap_err().is_silent());
        assert_eq!(session.phase(), SessionPhase::QuestionActive);
    }
}
