use thiserror::Error;

use crate::model::QuestionId;

/// A resolved question list that cannot back a session or be scored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no questions")]
    NoQuestions,

    #[error("question id {0} appears more than once")]
    DuplicateQuestionId(QuestionId),
}
