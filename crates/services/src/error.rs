//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::QuizError;
use quiz_core::model::{QuizConfigError, SessionStateError};
use storage::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by session services.
///
/// Out-of-range navigation and answers are not errors; they are ignored.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid quiz configuration: {0}")]
    InvalidConfiguration(#[from] QuizConfigError),
    #[error("invalid quiz: {0}")]
    InvalidQuiz(#[from] QuizError),
    #[error("session state rejected: {0}")]
    InvalidState(#[from] SessionStateError),
    #[error("session state is unavailable after a panic")]
    Poisoned,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping the quiz runtime.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
