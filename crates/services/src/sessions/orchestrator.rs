use chrono::Duration;
use quiz_core::model::{QuizConfigDraft, QuizQuestion, QuizSession, SessionId};
use quiz_core::report::QuizReport;
use quiz_core::scoring::{self, Score};
use quiz_core::Clock;

use super::countdown::Countdown;
use super::navigation::Navigation;
use super::progress::SessionProgress;
use super::store::SessionStore;
use crate::error::SessionError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// What triggered a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitReason {
    Manual,
    Timeout,
}

/// Result of a submit request. Only `Submitted` changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(Score),
    AlreadyCompleted,
    NoSession,
}

/// Result of one countdown tick for a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time remains; keep ticking.
    Running { remaining: Duration },
    /// Time ran out and this tick submitted the session.
    Expired { score: Score },
    /// The generation is gone, completed, or has no anchor; stop ticking.
    Stopped,
}

impl TickOutcome {
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

//
// ─── ORCHESTRATOR ──────────────────────────────────────────────────────────────
//

/// Lifecycle API over the single current quiz session.
///
/// States are `Idle` (no session), `Active` and `Completed`. Every mutation
/// goes through the store; callers only ever see shared references.
#[derive(Debug, Default)]
pub struct QuizOrchestrator {
    clock: Clock,
    store: SessionStore,
}

impl QuizOrchestrator {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            store: SessionStore::new(),
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Move a fixed clock forward. Used to drive timed sessions in tests.
    pub fn advance_clock(&mut self, delta: Duration) {
        self.clock.advance(delta);
    }

    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.store.get()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session().is_some_and(|s| !s.is_completed())
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        self.session().map(SessionProgress::of)
    }

    #[must_use]
    pub fn countdown(&self) -> Option<Countdown> {
        self.session().and_then(Countdown::for_session)
    }

    /// Remaining time for the active session, measured now.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        if !self.is_active() {
            return None;
        }
        let now = self.clock.now();
        self.countdown().map(|c| c.remaining(now))
    }

    #[must_use]
    pub fn report(&self) -> Option<QuizReport> {
        self.session().and_then(QuizReport::from_session)
    }

    /// Start a new generation from `config` and the resolved `questions`.
    ///
    /// Replaces any existing session. The number of questions is taken from
    /// `questions`, even if it differs from the requested count.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidConfiguration` for a bad config and
    /// `SessionError::InvalidQuiz` for an empty or duplicate question list.
    /// No session is created in either case.
    pub fn start(
        &mut self,
        config: QuizConfigDraft,
        questions: Vec<QuizQuestion>,
    ) -> Result<&QuizSession, SessionError> {
        let config = config.validate()?;
        if usize::try_from(config.question_count()).ok() != Some(questions.len()) {
            tracing::debug!(
                requested = config.question_count(),
                resolved = questions.len(),
                "question count differs from resolved list"
            );
        }

        let session = QuizSession::begin(config, questions, self.clock.now())?;
        if let Some(prev) = self.session() {
            tracing::debug!(session_id = %prev.id(), "replacing existing session");
        }
        tracing::info!(
            session_id = %session.id(),
            topic = session.config().topic(),
            questions = session.len(),
            minutes = session.config().time_limit_minutes(),
            "quiz session started"
        );

        self.store.replace(Some(session));
        self.session()
            .ok_or(SessionError::InvalidQuiz(quiz_core::QuizError::NoQuestions))
    }

    /// Restore a previously persisted session verbatim.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if `session` breaks an invariant.
    pub fn restore(&mut self, session: QuizSession) -> Result<(), SessionError> {
        session.check_invariants()?;
        tracing::info!(
            session_id = %session.id(),
            completed = session.is_completed(),
            "quiz session restored"
        );
        self.store.replace(Some(session));
        Ok(())
    }

    /// Record `option` for `question_index`.
    ///
    /// Ignored (returns `false`) when no session is active or either index is
    /// out of range. The question does not have to be the current one.
    pub fn answer(&mut self, question_index: usize, option: usize) -> bool {
        let Some(session) = self.session() else {
            return false;
        };
        if session.is_completed() {
            tracing::debug!(session_id = %session.id(), "answer ignored: session completed");
            return false;
        }
        let valid = session
            .questions()
            .get(question_index)
            .is_some_and(|q| q.has_option(option));
        if !valid {
            tracing::debug!(question_index, option, "answer ignored: out of range");
            return false;
        }

        self.store.apply(|s| s.with_answer(question_index, option))
    }

    /// Move the cursor. Out-of-range moves are ignored.
    pub fn navigate(&mut self, nav: Navigation) -> bool {
        let Some(session) = self.session() else {
            return false;
        };
        let Some(target) = nav.target(session.current_question_index(), session.len()) else {
            tracing::debug!(?nav, "navigation ignored: out of range");
            return false;
        };
        if target == session.current_question_index() {
            return true;
        }

        self.store.apply(|s| s.with_cursor(target))
    }

    pub fn go_to(&mut self, index: usize) -> bool {
        self.navigate(Navigation::GoTo(index))
    }

    pub fn next(&mut self) -> bool {
        self.navigate(Navigation::Next)
    }

    pub fn previous(&mut self) -> bool {
        self.navigate(Navigation::Previous)
    }

    /// Score and complete the active session.
    ///
    /// Safe to call repeatedly and from both the submit action and the
    /// countdown: only the first call on a generation scores it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidQuiz` if scoring fails.
    pub fn submit(&mut self) -> Result<SubmitOutcome, SessionError> {
        self.submit_with(SubmitReason::Manual)
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidQuiz` if scoring fails.
    pub fn submit_with(&mut self, reason: SubmitReason) -> Result<SubmitOutcome, SessionError> {
        let Some(session) = self.session() else {
            return Ok(SubmitOutcome::NoSession);
        };
        if session.is_completed() {
            tracing::debug!(session_id = %session.id(), ?reason, "submit ignored: already completed");
            return Ok(SubmitOutcome::AlreadyCompleted);
        }

        let score = scoring::score(session.questions(), session.answers())?;
        let ended_at = self.clock.now();
        let session_id = session.id();

        if !self.store.apply(|s| s.completed(score, ended_at)) {
            return Ok(SubmitOutcome::AlreadyCompleted);
        }
        tracing::info!(%session_id, %score, ?reason, "quiz session submitted");
        Ok(SubmitOutcome::Submitted(score))
    }

    /// Start a fresh generation of a completed session.
    ///
    /// Returns the new generation id, or `None` if there is no completed session.
    pub fn retake(&mut self) -> Option<SessionId> {
        let session = self.session()?;
        if !session.is_completed() {
            tracing::debug!(session_id = %session.id(), "retake ignored: session still active");
            return None;
        }
        let prev_id = session.id();
        let started_at = self.clock.now();

        if !self.store.apply(|s| s.next_generation(started_at)) {
            return None;
        }
        let next_id = self.session().map(QuizSession::id)?;
        tracing::info!(%prev_id, session_id = %next_id, "quiz session retaken");
        Some(next_id)
    }

    /// Drop the current session, returning to idle.
    pub fn discard(&mut self) -> Option<SessionId> {
        let session = self.store.take()?;
        tracing::info!(session_id = %session.id(), "quiz session discarded");
        Some(session.id())
    }

    /// Advance the countdown of generation `session_id`.
    ///
    /// Submits the session exactly once when its time runs out. Never fails;
    /// a scoring failure is logged and stops the countdown.
    pub fn tick(&mut self, session_id: SessionId) -> TickOutcome {
        let Some(session) = self.session() else {
            return TickOutcome::Stopped;
        };
        if session.id() != session_id || session.is_completed() {
            return TickOutcome::Stopped;
        }
        let Some(countdown) = Countdown::for_session(session) else {
            return TickOutcome::Stopped;
        };

        let now = self.clock.now();
        if !countdown.is_expired(now) {
            return TickOutcome::Running {
                remaining: countdown.remaining(now),
            };
        }

        match self.submit_with(SubmitReason::Timeout) {
            Ok(SubmitOutcome::Submitted(score)) => TickOutcome::Expired { score },
            Ok(_) => TickOutcome::Stopped,
            Err(err) => {
                tracing::error!(error = %err, %session_id, "timeout submission failed");
                TickOutcome::Stopped
            }
        }
    }
}
