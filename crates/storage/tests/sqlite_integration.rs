use chrono::Duration;
use quiz_core::model::{QuizConfig, QuizQuestion, QuizSession};
use quiz_core::scoring::score;
use quiz_core::time::fixed_now;
use storage::repository::{SessionSnapshotRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn build_session(topic: &str) -> QuizSession {
    let config = QuizConfig::new(2, 30, topic).unwrap();
    let questions = vec![
        QuizQuestion::new("qa", "A?", vec!["x".into(), "y".into()], 1, None).unwrap(),
        QuizQuestion::new(
            "qb",
            "B?",
            vec!["x".into(), "y".into(), "z".into()],
            0,
            Some("Because".into()),
        )
        .unwrap(),
    ];
    QuizSession::begin(config, questions, fixed_now()).unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_snapshot_round_trips_verbatim() {
    let repo = connect("memdb_snapshot_roundtrip").await;

    let session = build_session("Animals").with_answer(0, 1).with_cursor(1);
    repo.save_snapshot(&session, fixed_now()).await.unwrap();

    let loaded = repo.load_snapshot(session.id()).await.unwrap();
    assert_eq!(loaded.session, session);
    assert_eq!(loaded.saved_at, fixed_now());
}

#[tokio::test]
async fn sqlite_overwrites_and_orders_by_saved_at() {
    let repo = connect("memdb_snapshot_latest").await;

    let first = build_session("First");
    let second = build_session("Second");
    repo.save_snapshot(&first, fixed_now()).await.unwrap();
    repo.save_snapshot(&second, fixed_now() + Duration::seconds(10))
        .await
        .unwrap();

    let latest = repo.latest_snapshot().await.unwrap().unwrap();
    assert_eq!(latest.session.id(), second.id());

    let s = score(first.questions(), first.answers()).unwrap();
    let finished = first.completed(s, fixed_now() + Duration::seconds(20));
    repo.save_snapshot(&finished, fixed_now() + Duration::seconds(20))
        .await
        .unwrap();

    let latest = repo.latest_snapshot().await.unwrap().unwrap();
    assert_eq!(latest.session.id(), first.id());
    assert!(latest.session.is_completed());
}

#[tokio::test]
async fn sqlite_keeps_completed_snapshot_over_later_active_save() {
    let repo = connect("memdb_snapshot_no_downgrade").await;

    let active = build_session("Animals").with_answer(0, 1);
    let s = score(active.questions(), active.answers()).unwrap();
    let finished = active.completed(s, fixed_now() + Duration::minutes(1));
    repo.save_snapshot(&finished, fixed_now() + Duration::minutes(1))
        .await
        .unwrap();
    repo.save_snapshot(&active.with_cursor(1), fixed_now() + Duration::minutes(2))
        .await
        .unwrap();

    let stored = repo.load_snapshot(active.id()).await.unwrap();
    assert_eq!(stored.session, finished);
    assert_eq!(stored.saved_at, fixed_now() + Duration::minutes(1));
}

#[tokio::test]
async fn sqlite_delete_removes_snapshot() {
    let repo = connect("memdb_snapshot_delete").await;
    let session = build_session("Animals");
    repo.save_snapshot(&session, fixed_now()).await.unwrap();

    repo.delete_snapshot(session.id()).await.unwrap();

    assert!(matches!(
        repo.load_snapshot(session.id()).await,
        Err(StorageError::NotFound)
    ));
    assert!(repo.latest_snapshot().await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_rejects_snapshot_that_breaks_invariants() {
    let repo = connect("memdb_snapshot_corrupt").await;
    let session = build_session("Animals");

    let mut payload = serde_json::to_value(&session).unwrap();
    payload["current_question_index"] = serde_json::json!(9);

    sqlx::query(
        "INSERT INTO quiz_sessions (id, topic, is_completed, payload, saved_at) VALUES (?1, ?2, 0, ?3, ?4)",
    )
    .bind(session.id().to_string())
    .bind("Animals")
    .bind(payload.to_string())
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();

    assert!(matches!(
        repo.load_snapshot(session.id()).await,
        Err(StorageError::Serialization(_))
    ));
}
