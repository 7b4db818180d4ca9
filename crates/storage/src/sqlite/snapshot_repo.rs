use chrono::{DateTime, Utc};
use quiz_core::model::{QuizSession, SessionId};
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{SessionSnapshot, SessionSnapshotRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn map_snapshot_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionSnapshot, StorageError> {
    let payload: String = row.try_get("payload").map_err(ser)?;
    let saved_at: DateTime<Utc> = row.try_get("saved_at").map_err(ser)?;
    // Decoding re-checks every session invariant.
    let session: QuizSession = serde_json::from_str(&payload).map_err(ser)?;
    Ok(SessionSnapshot { session, saved_at })
}

#[async_trait::async_trait]
impl SessionSnapshotRepository for SqliteRepository {
    async fn save_snapshot(
        &self,
        session: &QuizSession,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let payload = serde_json::to_string(session).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO quiz_sessions (id, topic, is_completed, payload, saved_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    topic = excluded.topic,
                    is_completed = excluded.is_completed,
                    payload = excluded.payload,
                    saved_at = excluded.saved_at
                WHERE quiz_sessions.is_completed = 0
            ",
        )
        .bind(session.id().to_string())
        .bind(session.config().topic())
        .bind(i64::from(session.is_completed()))
        .bind(payload)
        .bind(saved_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn load_snapshot(&self, id: SessionId) -> Result<SessionSnapshot, StorageError> {
        let row = sqlx::query(
            r"
                SELECT payload, saved_at
                FROM quiz_sessions
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_snapshot_row(&row)
    }

    async fn latest_snapshot(&self) -> Result<Option<SessionSnapshot>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT payload, saved_at
                FROM quiz_sessions
                ORDER BY saved_at DESC
                LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_snapshot_row).transpose()
    }

    async fn delete_snapshot(&self, id: SessionId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM quiz_sessions WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
