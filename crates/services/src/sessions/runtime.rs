use std::sync::{Arc, Mutex, MutexGuard};

use quiz_core::Clock;
use quiz_core::model::{QuizConfigDraft, QuizSession, SessionId};
use quiz_core::report::QuizReport;
use rand::rng;
use rand::seq::SliceRandom;
use storage::repository::{QuestionBank, SessionSnapshotRepository, Storage, StorageError};
use storage::InMemoryQuestionBank;
use tokio::sync::watch;

use super::navigation::Navigation;
use super::orchestrator::{QuizOrchestrator, SubmitOutcome, SubmitReason, TickOutcome};
use super::progress::SessionProgress;
use super::timer::{CountdownHandle, DEFAULT_TICK_PERIOD, SharedOrchestrator};
use crate::error::{AppServicesError, SessionError};

/// Async front end of the quiz lifecycle.
///
/// Resolves questions through [`Storage`], keeps a snapshot of every change,
/// and runs one countdown per active generation. The orchestrator lock is
/// never held across an `.await`.
pub struct QuizRuntime {
    orchestrator: SharedOrchestrator,
    storage: Storage,
    timer: Option<CountdownHandle>,
    shuffle: bool,
}

impl QuizRuntime {
    #[must_use]
    pub fn new(clock: Clock, storage: Storage) -> Self {
        Self {
            orchestrator: Arc::new(Mutex::new(QuizOrchestrator::new(clock))),
            storage,
            timer: None,
            shuffle: false,
        }
    }

    /// Runtime backed by `SQLite` at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn sqlite(
        clock: Clock,
        database_url: &str,
        bank: InMemoryQuestionBank,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(database_url, bank).await?;
        Ok(Self::new(clock, storage))
    }

    /// Shuffle resolved questions before starting a session.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn orchestrator(&self) -> SharedOrchestrator {
        Arc::clone(&self.orchestrator)
    }

    fn lock(&self) -> Result<MutexGuard<'_, QuizOrchestrator>, SessionError> {
        self.orchestrator.lock().map_err(|_| SessionError::Poisoned)
    }

    /// Copy of the current session, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if the orchestrator lock is poisoned.
    pub fn session(&self) -> Result<Option<QuizSession>, SessionError> {
        Ok(self.lock()?.session().cloned())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if the orchestrator lock is poisoned.
    pub fn progress(&self) -> Result<Option<SessionProgress>, SessionError> {
        Ok(self.lock()?.progress())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if the orchestrator lock is poisoned.
    pub fn report(&self) -> Result<Option<QuizReport>, SessionError> {
        Ok(self.lock()?.report())
    }

    /// Countdown updates for the running generation, if one is ticking.
    #[must_use]
    pub fn countdown_updates(&self) -> Option<watch::Receiver<TickOutcome>> {
        self.timer.as_ref().map(CountdownHandle::subscribe)
    }

    /// Start a session for `draft`, replacing any existing one.
    ///
    /// A failed start leaves the current session and its countdown alone.
    /// After a successful one the replaced generation's snapshot is deleted.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidConfiguration` before touching storage if
    /// the draft is invalid, `SessionError::InvalidQuiz` if the bank has no
    /// usable questions for the topic, and `SessionError::Storage` if
    /// questions cannot be loaded.
    pub async fn start(&mut self, draft: QuizConfigDraft) -> Result<QuizSession, SessionError> {
        let config = draft.validate()?;
        let mut questions = self.storage.questions.questions_for(&config).await?;
        if self.shuffle {
            let mut rng = rng();
            questions.as_mut_slice().shuffle(&mut rng);
        }

        let (previous, session) = {
            let mut guard = self.lock()?;
            let previous = guard.session().map(QuizSession::id);
            let session = guard.start(QuizConfigDraft::from(config), questions)?.clone();
            (previous, session)
        };

        self.spawn_timer(&session);
        self.persist(&session).await;
        if let Some(previous) = previous {
            self.forget(previous).await;
        }
        Ok(session)
    }

    /// Record an answer. Returns `false` when it was ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if the orchestrator lock is poisoned.
    pub async fn answer(
        &mut self,
        question_index: usize,
        option: usize,
    ) -> Result<bool, SessionError> {
        let changed = {
            let mut guard = self.lock()?;
            guard
                .answer(question_index, option)
                .then(|| guard.session().cloned())
                .flatten()
        };
        Ok(self.persist_changed(changed).await)
    }

    /// Move the cursor. Returns `false` when the move was ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if the orchestrator lock is poisoned.
    pub async fn navigate(&mut self, nav: Navigation) -> Result<bool, SessionError> {
        let changed = {
            let mut guard = self.lock()?;
            guard
                .navigate(nav)
                .then(|| guard.session().cloned())
                .flatten()
        };
        Ok(self.persist_changed(changed).await)
    }

    /// Submit the active session and stop its countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if the orchestrator lock is poisoned
    /// and `SessionError::InvalidQuiz` if scoring fails.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, SessionError> {
        let (outcome, session) = {
            let mut guard = self.lock()?;
            let outcome = guard.submit_with(SubmitReason::Manual)?;
            (outcome, guard.session().cloned())
        };

        if let SubmitOutcome::Submitted(_) = outcome {
            self.timer = None;
            if let Some(session) = session {
                self.persist(&session).await;
            }
        }
        Ok(outcome)
    }

    /// Start a new generation of the completed session. The stored snapshot
    /// of the previous generation is replaced by the new one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if the orchestrator lock is poisoned.
    pub async fn retake(&mut self) -> Result<Option<SessionId>, SessionError> {
        let retaken = {
            let mut guard = self.lock()?;
            let previous = guard.session().map(QuizSession::id);
            guard
                .retake()
                .and_then(|_| guard.session().cloned())
                .map(|session| (previous, session))
        };
        let Some((previous, session)) = retaken else {
            return Ok(None);
        };

        self.spawn_timer(&session);
        self.persist(&session).await;
        if let Some(previous) = previous {
            self.forget(previous).await;
        }
        Ok(Some(session.id()))
    }

    /// Drop the current session and its stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if the orchestrator lock is poisoned
    /// and `SessionError::Storage` if the snapshot cannot be deleted.
    pub async fn discard(&mut self) -> Result<Option<SessionId>, SessionError> {
        self.timer = None;
        let discarded = self.lock()?.discard();
        if let Some(id) = discarded {
            match self.storage.snapshots.delete_snapshot(id).await {
                Ok(()) | Err(StorageError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(discarded)
    }

    /// Restore the most recently saved session, restarting its countdown if
    /// it is still active. A session whose time ran out while stored is
    /// submitted on the first tick.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the snapshot cannot be read and
    /// `SessionError::InvalidState` if it breaks a session invariant.
    pub async fn resume_latest(&mut self) -> Result<Option<QuizSession>, SessionError> {
        let Some(snapshot) = self.storage.snapshots.latest_snapshot().await? else {
            return Ok(None);
        };
        let session = snapshot.session;

        self.timer = None;
        self.lock()?.restore(session.clone())?;
        tracing::info!(
            session_id = %session.id(),
            saved_at = %snapshot.saved_at,
            "resumed saved quiz session"
        );
        if !session.is_completed() {
            self.spawn_timer(&session);
        }
        Ok(Some(session))
    }

    fn spawn_timer(&mut self, session: &QuizSession) {
        if session.started_at().is_none() {
            tracing::debug!(session_id = %session.id(), "session has no start time; countdown not started");
            return;
        }
        self.timer = Some(CountdownHandle::spawn(
            Arc::clone(&self.orchestrator),
            session.id(),
            DEFAULT_TICK_PERIOD,
            Some(Arc::clone(&self.storage.snapshots)),
        ));
    }

    async fn persist_changed(&self, changed: Option<QuizSession>) -> bool {
        match changed {
            Some(session) => {
                self.persist(&session).await;
                true
            }
            None => false,
        }
    }

    /// Delete the snapshot of a replaced generation.
    async fn forget(&self, id: SessionId) {
        match self.storage.snapshots.delete_snapshot(id).await {
            Ok(()) | Err(StorageError::NotFound) => {}
            Err(err) => {
                tracing::warn!(error = %err, session_id = %id, "failed to delete replaced session snapshot");
            }
        }
    }

    /// Save a snapshot. Failures are logged; the in-memory session stays
    /// authoritative.
    async fn persist(&self, session: &QuizSession) {
        let saved_at = self
            .orchestrator
            .lock()
            .map_or_else(|_| chrono::Utc::now(), |guard| guard.clock().now());
        if let Err(err) = self.storage.snapshots.save_snapshot(session, saved_at).await {
            tracing::warn!(error = %err, session_id = %session.id(), "failed to save session snapshot");
        }
    }
}
