use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::error::QuizError;
use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question {id} needs at least 2 options, got {len}")]
    TooFewOptions { id: QuestionId, len: usize },

    #[error("question {id} marks option {index} correct but only has {len} options")]
    CorrectAnswerOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question, read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuizQuestionRecord")]
pub struct QuizQuestion {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_answer_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

impl QuizQuestion {
    /// Build a question, checking its shape.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the id is blank, fewer than two options are
    /// given, or the correct index does not point at an option.
    pub fn new(
        id: impl Into<QuestionId>,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_answer_index: usize,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        let id = id.into();
        if id.is_empty() {
            return Err(QuestionError::EmptyId);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                id,
                len: options.len(),
            });
        }
        if correct_answer_index >= options.len() {
            return Err(QuestionError::CorrectAnswerOutOfRange {
                id,
                index: correct_answer_index,
                len: options.len(),
            });
        }

        Ok(Self {
            id,
            prompt: prompt.into(),
            options,
            correct_answer_index,
            explanation: explanation.filter(|text| !text.trim().is_empty()),
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer_index(&self) -> usize {
        self.correct_answer_index
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Returns true if `option` is a valid index into this question's options.
    #[must_use]
    pub fn has_option(&self, option: usize) -> bool {
        option < self.options.len()
    }

    /// An unset answer never matches.
    #[must_use]
    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct_answer_index)
    }
}

/// Checks that question ids are unique within one quiz.
///
/// # Errors
///
/// Returns `QuizError::DuplicateQuestionId` for the first repeated id.
pub fn ensure_unique_ids(questions: &[QuizQuestion]) -> Result<(), QuizError> {
    let mut seen = HashSet::with_capacity(questions.len());
    for question in questions {
        if !seen.insert(question.id()) {
            return Err(QuizError::DuplicateQuestionId(question.id().clone()));
        }
    }
    Ok(())
}

#[derive(Deserialize)]
struct QuizQuestionRecord {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_answer_index: usize,
    #[serde(default)]
    explanation: Option<String>,
}

impl TryFrom<QuizQuestionRecord> for QuizQuestion {
    type Error = QuestionError;

    fn try_from(record: QuizQuestionRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.id,
            record.prompt,
            record.options,
            record.correct_answer_index,
            record.explanation,
        )
    }
}
