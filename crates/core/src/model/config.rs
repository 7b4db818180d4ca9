use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizConfigError {
    #[error("question count must be > 0")]
    ZeroQuestionCount,

    #[error("time limit must be > 0 minutes")]
    ZeroTimeLimit,

    #[error("quiz topic cannot be empty")]
    EmptyTopic,

    #[error("{field} is too large: {value}")]
    TooLarge { field: &'static str, value: i64 },
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Parameters a quiz session is started from.
///
/// Immutable once attached to a session: retakes share the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "QuizConfigRecord")]
pub struct QuizConfig {
    question_count: u32,
    time_limit_minutes: u32,
    topic: String,
}

impl QuizConfig {
    /// Question count pre-filled by the configuration dialog.
    pub const DEFAULT_QUESTION_COUNT: u32 = 10;
    /// Time limit pre-filled by the configuration dialog.
    pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 30;

    /// Creates a validated configuration.
    ///
    /// The topic is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns `QuizConfigError` if either number is zero or the topic is blank.
    pub fn new(
        question_count: u32,
        time_limit_minutes: u32,
        topic: impl Into<String>,
    ) -> Result<Self, QuizConfigError> {
        if question_count == 0 {
            return Err(QuizConfigError::ZeroQuestionCount);
        }
        if time_limit_minutes == 0 {
            return Err(QuizConfigError::ZeroTimeLimit);
        }
        let topic = topic.into().trim().to_owned();
        if topic.is_empty() {
            return Err(QuizConfigError::EmptyTopic);
        }

        Ok(Self {
            question_count,
            time_limit_minutes,
            topic,
        })
    }

    /// Number of questions requested. The resolved question list decides the
    /// actual session length.
    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Total time allowed for one generation of the quiz.
    #[must_use]
    pub fn time_limit(&self) -> Duration {
        Duration::minutes(i64::from(self.time_limit_minutes))
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated configuration as entered in a form.
///
/// Numbers are signed so that negative input is reported as a configuration
/// error instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfigDraft {
    pub question_count: i64,
    pub time_limit_minutes: i64,
    pub topic: String,
}

impl Default for QuizConfigDraft {
    fn default() -> Self {
        Self {
            question_count: i64::from(QuizConfig::DEFAULT_QUESTION_COUNT),
            time_limit_minutes: i64::from(QuizConfig::DEFAULT_TIME_LIMIT_MINUTES),
            topic: String::new(),
        }
    }
}

impl QuizConfigDraft {
    #[must_use]
    pub fn new(question_count: i64, time_limit_minutes: i64, topic: impl Into<String>) -> Self {
        Self {
            question_count,
            time_limit_minutes,
            topic: topic.into(),
        }
    }

    /// # Errors
    ///
    /// Returns `QuizConfigError` if a number is not positive or does not fit,
    /// or if the topic is blank.
    pub fn validate(self) -> Result<QuizConfig, QuizConfigError> {
        if self.question_count <= 0 {
            return Err(QuizConfigError::ZeroQuestionCount);
        }
        if self.time_limit_minutes <= 0 {
            return Err(QuizConfigError::ZeroTimeLimit);
        }
        let question_count =
            u32::try_from(self.question_count).map_err(|_| QuizConfigError::TooLarge {
                field: "question count",
                value: self.question_count,
            })?;
        let time_limit_minutes =
            u32::try_from(self.time_limit_minutes).map_err(|_| QuizConfigError::TooLarge {
                field: "time limit",
                value: self.time_limit_minutes,
            })?;
        QuizConfig::new(question_count, time_limit_minutes, self.topic)
    }
}

impl From<QuizConfig> for QuizConfigDraft {
    fn from(config: QuizConfig) -> Self {
        Self {
            question_count: i64::from(config.question_count),
            time_limit_minutes: i64::from(config.time_limit_minutes),
            topic: config.topic,
        }
    }
}

#[derive(Deserialize)]
struct QuizConfigRecord {
    question_count: u32,
    time_limit_minutes: u32,
    topic: String,
}

impl TryFrom<QuizConfigRecord> for QuizConfig {
    type Error = QuizConfigError;

    fn try_from(record: QuizConfigRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.question_count,
            record.time_limit_minutes,
            record.topic,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_topic() {
        let config = QuizConfig::new(2, 30, "  Animals ").unwrap();
        assert_eq!(config.topic(), "Animals");
        assert_eq!(config.time_limit(), Duration::minutes(30));
    }

    #[test]
    fn rejects_zero_and_blank_values() {
        assert_eq!(
            QuizConfig::new(0, 30, "Animals").unwrap_err(),
            QuizConfigError::ZeroQuestionCount
        );
        assert_eq!(
            QuizConfig::new(5, 0, "Animals").unwrap_err(),
            QuizConfigError::ZeroTimeLimit
        );
        assert_eq!(
            QuizConfig::new(5, 30, "   ").unwrap_err(),
            QuizConfigError::EmptyTopic
        );
    }

    #[test]
    fn draft_reports_non_positive_and_oversized_numbers() {
        assert_eq!(
            QuizConfigDraft::new(-3, 30, "Animals").validate().unwrap_err(),
            QuizConfigError::ZeroQuestionCount
        );
        assert_eq!(
            QuizConfigDraft::new(3, -1, "Animals").validate().unwrap_err(),
            QuizConfigError::ZeroTimeLimit
        );
        assert!(matches!(
            QuizConfigDraft::new(i64::MAX, 1, "Animals").validate().unwrap_err(),
            QuizConfigError::TooLarge { .. }
        ));
    }

    #[test]
    fn draft_defaults_match_dialog() {
        let draft = QuizConfigDraft {
            topic: "History".into(),
            ..QuizConfigDraft::default()
        };
        let config = draft.validate().unwrap();
        assert_eq!(config.question_count(), 10);
        assert_eq!(config.time_limit_minutes(), 30);
    }

    #[test]
    fn deserialize_runs_validation() {
        let ok: QuizConfig =
            serde_json::from_str(r#"{"question_count":3,"time_limit_minutes":5,"topic":"Math"}"#)
                .unwrap();
        assert_eq!(ok.question_count(), 3);

        let bad = serde_json::from_str::<QuizConfig>(
            r#"{"question_count":3,"time_limit_minutes":0,"topic":"Math"}"#,
        );
        assert!(bad.is_err());
    }
}
