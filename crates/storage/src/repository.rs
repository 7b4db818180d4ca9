use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{QuizConfig, QuizQuestion, QuizSession, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::question_bank::InMemoryQuestionBank;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Provider of questions for a quiz configuration.
///
/// Implementations decide where questions come from; the session engine only
/// relies on the returned order and on each question's shape.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Resolve the ordered question list for `config`.
    ///
    /// An unknown topic yields an empty list rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing source cannot be read.
    async fn questions_for(&self, config: &QuizConfig) -> Result<Vec<QuizQuestion>, StorageError>;
}

/// A persisted session together with the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session: QuizSession,
    pub saved_at: DateTime<Utc>,
}

/// Verbatim persistence for whole `QuizSession` values.
#[async_trait]
pub trait SessionSnapshotRepository: Send + Sync {
    /// Insert or overwrite the snapshot for `session.id()`.
    ///
    /// A completed snapshot is final: later saves for the same id leave it
    /// untouched and still return `Ok`, so a slow write of an older active
    /// copy cannot undo a submission.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn save_snapshot(
        &self,
        session: &QuizSession,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Fetch a snapshot by session id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or `Serialization` if the
    /// stored value no longer satisfies the session invariants.
    async fn load_snapshot(&self, id: SessionId) -> Result<SessionSnapshot, StorageError>;

    /// Most recently saved snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for read or decode failures.
    async fn latest_snapshot(&self) -> Result<Option<SessionSnapshot>, StorageError>;

    /// Remove a snapshot. Removing a missing id is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete cannot be performed.
    async fn delete_snapshot(&self, id: SessionId) -> Result<(), StorageError>;
}

/// In-memory snapshot store for tests and runs without a database.
#[derive(Clone, Default)]
pub struct InMemorySnapshotRepository {
    snapshots: Arc<Mutex<HashMap<SessionId, SessionSnapshot>>>,
}

impl InMemorySnapshotRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionSnapshotRepository for InMemorySnapshotRepository {
    async fn save_snapshot(
        &self,
        session: &QuizSession,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard
            .get(&session.id())
            .is_some_and(|stored| stored.session.is_completed())
        {
            tracing::debug!(session_id = %session.id(), "snapshot already completed; save skipped");
            return Ok(());
        }
        guard.insert(
            session.id(),
            SessionSnapshot {
                session: session.clone(),
                saved_at,
            },
        );
        Ok(())
    }

    async fn load_snapshot(&self, id: SessionId) -> Result<SessionSnapshot, StorageError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn latest_snapshot(&self) -> Result<Option<SessionSnapshot>, StorageError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().max_by_key(|s| s.saved_at).cloned())
    }

    async fn delete_snapshot(&self, id: SessionId) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id);
        Ok(())
    }
}

/// Bundles the question provider and snapshot store behind trait objects.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionBank>,
    pub snapshots: Arc<dyn SessionSnapshotRepository>,
}

impl Storage {
    /// Storage backed entirely by memory, starting from `bank`.
    #[must_use]
    pub fn in_memory(bank: InMemoryQuestionBank) -> Self {
        Self {
            questions: Arc::new(bank),
            snapshots: Arc::new(InMemorySnapshotRepository::new()),
        }
    }
}
