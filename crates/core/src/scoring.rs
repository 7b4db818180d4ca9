//! Percentage scoring for a set of answers.
//!
//! Everything in this module is pure: the same questions and answers always
//! produce the same score, regardless of traversal order.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::QuizError;
use crate::model::QuizQuestion;

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("score must be within 0..=100, got {0}")]
pub struct ScoreOutOfRange(pub u32);

/// Whole-number percentage in `0..=100`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Score(u8);

impl Score {
    pub const MAX: Self = Self(100);

    /// # Errors
    ///
    /// Returns `ScoreOutOfRange` for values above 100.
    pub fn new(percent: u32) -> Result<Self, ScoreOutOfRange> {
        u8::try_from(percent)
            .ok()
            .filter(|p| *p <= 100)
            .map(Self)
            .ok_or(ScoreOutOfRange(percent))
    }

    #[must_use]
    pub fn percent(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn band(self) -> ScoreBand {
        ScoreBand::for_score(self)
    }

    #[must_use]
    pub fn tier(self) -> ScoreTier {
        ScoreTier::for_score(self)
    }
}

impl TryFrom<u32> for Score {
    type Error = ScoreOutOfRange;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u32 {
    fn from(score: Score) -> Self {
        u32::from(score.0)
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Score({}%)", self.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

//
// ─── BANDS ─────────────────────────────────────────────────────────────────────
//

/// Feedback bucket shown with a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBand {
    Excellent,
    Great,
    Good,
    Fair,
    NeedsPractice,
}

impl ScoreBand {
    #[must_use]
    pub fn for_score(score: Score) -> Self {
        match score.percent() {
            90.. => Self::Excellent,
            80..=89 => Self::Great,
            70..=79 => Self::Good,
            60..=69 => Self::Fair,
            _ => Self::NeedsPractice,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent! Outstanding performance!",
            Self::Great => "Great job! Well done!",
            Self::Good => "Good work! Keep it up!",
            Self::Fair => "Not bad! Try to improve more.",
            Self::NeedsPractice => "Keep practicing! You can do better!",
        }
    }
}

/// Coarse grouping used for coloring a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreTier {
    High,
    Medium,
    Low,
}

impl ScoreTier {
    #[must_use]
    pub fn for_score(score: Score) -> Self {
        match score.percent() {
            80.. => Self::High,
            60..=79 => Self::Medium,
            _ => Self::Low,
        }
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Number of answers equal to their question's correct option.
///
/// Answers are paired with questions by index; a missing or unset answer is
/// incorrect.
#[must_use]
pub fn correct_count(questions: &[QuizQuestion], answers: &[Option<usize>]) -> usize {
    questions
        .iter()
        .enumerate()
        .filter(|(i, question)| question.is_correct(answers.get(*i).copied().flatten()))
        .count()
}

/// Scores `answers` against `questions` as a rounded percentage.
///
/// Rounds half up, so one correct out of eight is 13.
///
/// # Errors
///
/// Returns `QuizError::NoQuestions` for an empty question list.
pub fn score(questions: &[QuizQuestion], answers: &[Option<usize>]) -> Result<Score, QuizError> {
    if questions.is_empty() {
        return Err(QuizError::NoQuestions);
    }

    let correct = correct_count(questions, answers) as u64;
    let total = questions.len() as u64;
    let percent = (correct * 200 + total) / (total * 2);

    // correct <= total keeps percent within 0..=100
    Ok(Score(u8::try_from(percent).unwrap_or(100)))
}
