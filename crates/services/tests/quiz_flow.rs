use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{QuizConfigDraft, QuizQuestion, QuizSession, SessionId};
use quiz_core::report::QuestionOutcome;
use quiz_core::time::fixed_clock;
use services::{Navigation, QuizRuntime, SessionError, SubmitOutcome, TickOutcome};
use storage::{
    InMemoryQuestionBank, InMemorySnapshotRepository, SessionSnapshot, SessionSnapshotRepository,
    Storage, StorageError,
};

fn animals_bank() -> InMemoryQuestionBank {
    let bank = InMemoryQuestionBank::new();
    bank.insert_topic(
        "Animals",
        vec![
            QuizQuestion::new(
                "whale",
                "Largest mammal?",
                vec!["Elephant".into(), "Blue whale".into()],
                1,
                None,
            )
            .unwrap(),
            QuizQuestion::new(
                "cheetah",
                "Fastest land animal?",
                vec!["Cheetah".into(), "Horse".into(), "Lion".into()],
                0,
                Some("Up to 120 km/h.".into()),
            )
            .unwrap(),
            QuizQuestion::new(
                "bat",
                "Which mammal can fly?",
                vec!["Bat".into(), "Squirrel".into()],
                0,
                None,
            )
            .unwrap(),
        ],
    )
    .unwrap();
    bank
}

/// Snapshot store whose writes of unfinished sessions take a few seconds.
#[derive(Default)]
struct SlowActiveSaves {
    inner: InMemorySnapshotRepository,
}

#[async_trait]
impl SessionSnapshotRepository for SlowActiveSaves {
    async fn save_snapshot(
        &self,
        session: &QuizSession,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if !session.is_completed() {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        }
        self.inner.save_snapshot(session, saved_at).await
    }

    async fn load_snapshot(&self, id: SessionId) -> Result<SessionSnapshot, StorageError> {
        self.inner.load_snapshot(id).await
    }

    async fn latest_snapshot(&self) -> Result<Option<SessionSnapshot>, StorageError> {
        self.inner.latest_snapshot().await
    }

    async fn delete_snapshot(&self, id: SessionId) -> Result<(), StorageError> {
        self.inner.delete_snapshot(id).await
    }
}

#[tokio::test(start_paused = true)]
async fn full_quiz_flow_scores_and_retakes() {
    let mut runtime = QuizRuntime::new(fixed_clock(), Storage::in_memory(animals_bank()));
    let session = runtime
        .start(QuizConfigDraft::new(3, 5, "animals"))
        .await
        .unwrap();
    assert_eq!(session.len(), 3);
    assert_eq!(session.config().topic(), "animals");

    assert!(runtime.answer(0, 1).await.unwrap());
    assert!(runtime.navigate(Navigation::Next).await.unwrap());
    assert!(runtime.answer(1, 0).await.unwrap());
    assert!(runtime.navigate(Navigation::Next).await.unwrap());
    assert!(!runtime.navigate(Navigation::Next).await.unwrap());
    assert!(runtime.answer(2, 0).await.unwrap());

    let outcome = runtime.submit().await.unwrap();
    let SubmitOutcome::Submitted(score) = outcome else {
        panic!("expected submission, got {outcome:?}");
    };
    assert_eq!(score.percent(), 100);

    let report = runtime.report().unwrap().unwrap();
    assert_eq!(report.correct, 3);
    assert!(report
        .reviews
        .iter()
        .all(|r| r.outcome == QuestionOutcome::Correct));

    let first_id = session.id();
    let retake_id = runtime.retake().await.unwrap().unwrap();
    assert_ne!(retake_id, first_id);

    let fresh = runtime.session().unwrap().unwrap();
    assert_eq!(fresh.questions(), session.questions());
    assert!(fresh.answers().iter().all(Option::is_none));
    assert!(runtime.countdown_updates().is_some());
}

#[tokio::test(start_paused = true)]
async fn countdown_submits_when_time_runs_out() {
    let storage = Storage::in_memory(animals_bank());
    let mut runtime = QuizRuntime::new(fixed_clock(), storage.clone());
    let session = runtime
        .start(QuizConfigDraft::new(3, 1, "Animals"))
        .await
        .unwrap();
    runtime.answer(0, 1).await.unwrap();

    let mut updates = runtime.countdown_updates().unwrap();
    runtime
        .orchestrator()
        .lock()
        .unwrap()
        .advance_clock(Duration::seconds(75));

    let outcome = *updates
        .wait_for(|o| !o.is_running())
        .await
        .unwrap();
    let TickOutcome::Expired { score } = outcome else {
        panic!("expected expiry, got {outcome:?}");
    };
    assert_eq!(score.percent(), 33);

    // A late manual submit must not rescore.
    assert_eq!(runtime.submit().await.unwrap(), SubmitOutcome::AlreadyCompleted);

    let saved = storage
        .snapshots
        .load_snapshot(session.id())
        .await
        .unwrap();
    assert!(saved.session.is_completed());
    assert_eq!(saved.session.score(), Some(score));
}

#[tokio::test(start_paused = true)]
async fn resume_restores_latest_snapshot() {
    let storage = Storage::in_memory(animals_bank());

    let started = {
        let mut runtime = QuizRuntime::new(fixed_clock(), storage.clone());
        runtime
            .start(QuizConfigDraft::new(2, 10, "Animals"))
            .await
            .unwrap();
        runtime.answer(1, 2).await.unwrap();
        runtime.navigate(Navigation::GoTo(1)).await.unwrap();
        runtime.session().unwrap().unwrap()
    };

    let mut resumed = QuizRuntime::new(fixed_clock(), storage);
    let session = resumed.resume_latest().await.unwrap().unwrap();
    assert_eq!(session, started);
    assert_eq!(session.answers(), &[None, Some(2)]);
    assert_eq!(session.current_question_index(), 1);
    assert!(resumed.countdown_updates().is_some());
}

#[tokio::test(start_paused = true)]
async fn resume_without_snapshot_is_idle() {
    let mut runtime = QuizRuntime::new(fixed_clock(), Storage::in_memory(animals_bank()));
    assert!(runtime.resume_latest().await.unwrap().is_none());
    assert!(runtime.session().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_start_keeps_current_countdown() {
    let mut runtime = QuizRuntime::new(fixed_clock(), Storage::in_memory(animals_bank()));
    let session = runtime
        .start(QuizConfigDraft::new(3, 1, "Animals"))
        .await
        .unwrap();

    let err = runtime
        .start(QuizConfigDraft::new(3, 5, "Geology"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidQuiz(_)));
    assert_eq!(runtime.session().unwrap().unwrap().id(), session.id());

    let mut updates = runtime
        .countdown_updates()
        .expect("countdown of the current session keeps running");
    runtime
        .orchestrator()
        .lock()
        .unwrap()
        .advance_clock(Duration::minutes(2));

    let outcome = *updates
        .wait_for(|o| !o.is_running())
        .await
        .unwrap();
    assert!(matches!(outcome, TickOutcome::Expired { .. }));
    assert!(runtime.session().unwrap().unwrap().is_completed());
}

#[tokio::test(start_paused = true)]
async fn slow_answer_save_does_not_undo_timeout() {
    let snapshots = Arc::new(SlowActiveSaves::default());
    let storage = Storage {
        questions: Arc::new(animals_bank()),
        snapshots: snapshots.clone(),
    };
    let mut runtime = QuizRuntime::new(fixed_clock(), storage);
    let session = runtime
        .start(QuizConfigDraft::new(3, 1, "Animals"))
        .await
        .unwrap();
    let mut updates = runtime.countdown_updates().unwrap();
    let orchestrator = runtime.orchestrator();

    // The time limit passes while the answer's snapshot is still being written.
    let (answered, outcome) = tokio::join!(runtime.answer(0, 1), async {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        orchestrator
            .lock()
            .unwrap()
            .advance_clock(Duration::seconds(75));
        *updates.wait_for(|o| !o.is_running()).await.unwrap()
    });
    assert!(answered.unwrap());
    let TickOutcome::Expired { score } = outcome else {
        panic!("expected expiry, got {outcome:?}");
    };
    assert_eq!(score.percent(), 33);

    let stored = snapshots.load_snapshot(session.id()).await.unwrap();
    assert!(stored.session.is_completed());
    assert_eq!(stored.session.score(), Some(score));
    assert_eq!(runtime.session().unwrap().unwrap(), stored.session);
}
