//! Question providers backed by memory or a JSON file.

use async_trait::async_trait;
use quiz_core::model::{QuizConfig, QuizQuestion};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::repository::{QuestionBank, StorageError};

/// On-disk layout of a question bank file.
///
/// ```json
/// { "topics": [ { "topic": "Animals", "questions": [ { "id": "a1", ... } ] } ] }
/// ```
#[derive(Debug, Deserialize)]
struct QuestionBankFile {
    topics: Vec<TopicEntry>,
}

#[derive(Debug, Deserialize)]
struct TopicEntry {
    topic: String,
    questions: Vec<QuizQuestion>,
}

fn topic_key(topic: &str) -> String {
    topic.trim().to_lowercase()
}

/// Question bank keyed by topic (case-insensitive).
///
/// Returns a topic's questions in insertion order, truncated to the
/// configured question count.
#[derive(Clone, Debug, Default)]
pub struct InMemoryQuestionBank {
    topics: Arc<Mutex<HashMap<String, Vec<QuizQuestion>>>>,
}

impl InMemoryQuestionBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the questions stored for `topic`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_topic(
        &self,
        topic: &str,
        questions: Vec<QuizQuestion>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .topics
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(topic_key(topic), questions);
        Ok(())
    }

    /// Topics currently known, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn topics(&self) -> Result<Vec<String>, StorageError> {
        let guard = self
            .topics
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut topics: Vec<_> = guard.keys().cloned().collect();
        topics.sort();
        Ok(topics)
    }

    /// Parse a bank from its JSON representation.
    ///
    /// Every question is validated while decoding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed JSON or invalid questions.
    pub fn from_json_str(raw: &str) -> Result<Self, StorageError> {
        let file: QuestionBankFile =
            serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let bank = Self::new();
        for entry in file.topics {
            tracing::debug!(topic = %entry.topic, count = entry.questions.len(), "loaded topic");
            bank.insert_topic(&entry.topic, entry.questions)?;
        }
        Ok(bank)
    }

    /// Read and parse a bank file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the file is missing,
    /// `StorageError::Connection` for other I/O failures, and
    /// `StorageError::Serialization` for invalid content.
    pub fn from_json_file(path: &Path) -> Result<Self, StorageError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            _ => StorageError::Connection(format!("{}: {e}", path.display())),
        })?;
        Self::from_json_str(&raw)
    }
}

#[async_trait]
impl QuestionBank for InMemoryQuestionBank {
    async fn questions_for(&self, config: &QuizConfig) -> Result<Vec<QuizQuestion>, StorageError> {
        let guard = self
            .topics
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(config.question_count()).unwrap_or(usize::MAX);
        Ok(guard
            .get(&topic_key(config.topic()))
            .map(|questions| questions.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
