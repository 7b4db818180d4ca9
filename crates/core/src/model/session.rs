use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::error::QuizError;
use crate::model::question::ensure_unique_ids;
use crate::model::{QuizConfig, QuizQuestion, SessionId};
use crate::scoring::Score;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A session value that breaks one of the aggregate invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("session has no questions")]
    NoQuestions,

    #[error("answer buffer has {answers} slots for {questions} questions")]
    AnswerBufferMismatch { answers: usize, questions: usize },

    #[error("current question {index} is outside 0..{len}")]
    CursorOutOfRange { index: usize, len: usize },

    #[error("answer {option} for question {question} is not one of its options")]
    AnswerOutOfRange { question: usize, option: usize },

    #[error("score must be set exactly when the session is completed")]
    ScoreMismatch,

    #[error("end time must be set exactly when the session is completed")]
    EndTimeMismatch,

    #[error("end time is before start time")]
    InvalidTimeRange,

    #[error("answers changed after the session was completed")]
    AnswersFrozen,

    #[error("question list changed within one session generation")]
    QuestionsChanged,
}

/// Coarse lifecycle state of a stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Active,
    Completed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One generation of a quiz attempt.
///
/// Values are never edited in place: every transition below returns a new
/// session built from the untouched fields of `self`. Transitions are
/// mechanical and do not guard against misuse; callers validate with
/// [`QuizSession::check_invariants`] and [`QuizSession::check_transition`]
/// before accepting the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuizSessionRecord")]
pub struct QuizSession {
    id: SessionId,
    config: QuizConfig,
    questions: Arc<Vec<QuizQuestion>>,
    current_question_index: usize,
    answers: Vec<Option<usize>>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    is_completed: bool,
    score: Option<Score>,
}

impl QuizSession {
    /// Start a new active generation.
    ///
    /// The session length is the length of `questions`, not
    /// `config.question_count()`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` for an empty list and
    /// `QuizError::DuplicateQuestionId` if two questions share an id.
    pub fn begin(
        config: QuizConfig,
        questions: Vec<QuizQuestion>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        ensure_unique_ids(&questions)?;

        let answers = vec![None; questions.len()];
        Ok(Self {
            id: SessionId::generate(),
            config,
            questions: Arc::new(questions),
            current_question_index: 0,
            answers,
            started_at: Some(started_at),
            ended_at: None,
            is_completed: false,
            score: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// Returns true if both sessions point at the same question list allocation.
    #[must_use]
    pub fn shares_questions_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.questions, &other.questions)
    }

    /// Number of questions (N).
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current_question_index)
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, question_index: usize) -> Option<usize> {
        self.answers.get(question_index).copied().flatten()
    }

    /// Number of questions that have a chosen option.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn score(&self) -> Option<Score> {
        self.score
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        if self.is_completed {
            SessionStatus::Completed
        } else {
            SessionStatus::Active
        }
    }

    /// Instant the time limit runs out, anchored on `started_at`.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.started_at.map(|start| start + self.config.time_limit())
    }

    /// Time between start and submission, for completed sessions.
    #[must_use]
    pub fn time_spent(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Copy with `answers[question_index]` set to `option`.
    ///
    /// An index past the answer buffer leaves the copy unchanged.
    #[must_use]
    pub fn with_answer(&self, question_index: usize, option: usize) -> Self {
        let mut answers = self.answers.clone();
        if let Some(slot) = answers.get_mut(question_index) {
            *slot = Some(option);
        }
        Self {
            answers,
            ..self.clone()
        }
    }

    /// Copy with the cursor moved to `index`.
    #[must_use]
    pub fn with_cursor(&self, index: usize) -> Self {
        Self {
            current_question_index: index,
            ..self.clone()
        }
    }

    /// Copy marked completed with a final score and end time.
    #[must_use]
    pub fn completed(&self, score: Score, ended_at: DateTime<Utc>) -> Self {
        Self {
            ended_at: Some(ended_at),
            is_completed: true,
            score: Some(score),
            ..self.clone()
        }
    }

    /// Fresh active generation sharing config and questions.
    #[must_use]
    pub fn next_generation(&self, started_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::generate(),
            config: self.config.clone(),
            questions: Arc::clone(&self.questions),
            current_question_index: 0,
            answers: vec![None; self.questions.len()],
            started_at: Some(started_at),
            ended_at: None,
            is_completed: false,
            score: None,
        }
    }

    //
    // ─── INVARIANTS ────────────────────────────────────────────────────────────
    //

    /// Checks every invariant that applies to a single session value.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), SessionStateError> {
        let len = self.questions.len();
        if len == 0 {
            return Err(SessionStateError::NoQuestions);
        }
        if self.answers.len() != len {
            return Err(SessionStateError::AnswerBufferMismatch {
                answers: self.answers.len(),
                questions: len,
            });
        }
        if self.current_question_index >= len {
            return Err(SessionStateError::CursorOutOfRange {
                index: self.current_question_index,
                len,
            });
        }
        for (question, (q, answer)) in self.questions.iter().zip(&self.answers).enumerate() {
            match *answer {
                Some(option) if !q.has_option(option) => {
                    return Err(SessionStateError::AnswerOutOfRange { question, option });
                }
                _ => {}
            }
        }
        if self.score.is_some() != self.is_completed {
            return Err(SessionStateError::ScoreMismatch);
        }
        if self.ended_at.is_some() != self.is_completed {
            return Err(SessionStateError::EndTimeMismatch);
        }
        if let (Some(start), Some(end)) = (self.started_at, self.ended_at) {
            if end < start {
                return Err(SessionStateError::InvalidTimeRange);
            }
        }
        Ok(())
    }

    /// Checks rules that relate a session to the value it replaces.
    ///
    /// Within one generation (same id) the question list is fixed, and a
    /// completed session's answers are frozen.
    ///
    /// # Errors
    ///
    /// Returns the violated rule.
    pub fn check_transition(prev: &Self, next: &Self) -> Result<(), SessionStateError> {
        if prev.id != next.id {
            return Ok(());
        }
        if prev.questions != next.questions {
            return Err(SessionStateError::QuestionsChanged);
        }
        if prev.is_completed && next.answers != prev.answers {
            return Err(SessionStateError::AnswersFrozen);
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct QuizSessionRecord {
    id: SessionId,
    config: QuizConfig,
    questions: Vec<QuizQuestion>,
    current_question_index: usize,
    answers: Vec<Option<usize>>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    is_completed: bool,
    score: Option<Score>,
}

impl TryFrom<QuizSessionRecord> for QuizSession {
    type Error = SessionStateError;

    fn try_from(record: QuizSessionRecord) -> Result<Self, Self::Error> {
        if ensure_unique_ids(&record.questions).is_err() {
            return Err(SessionStateError::QuestionsChanged);
        }
        let session = Self {
            id: record.id,
            config: record.config,
            questions: Arc::new(record.questions),
            current_question_index: record.current_question_index,
            answers: record.answers,
            started_at: record.started_at,
            ended_at: record.ended_at,
            is_completed: record.is_completed,
            score: record.score,
        };
        session.check_invariants()?;
        Ok(session)
    }
}
