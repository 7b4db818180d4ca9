use std::sync::{Arc, Mutex};
use std::time::Duration;

use quiz_core::model::{QuizSession, SessionId};
use storage::repository::SessionSnapshotRepository;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::orchestrator::{QuizOrchestrator, TickOutcome};

/// Orchestrator shared between the caller and the countdown task.
pub type SharedOrchestrator = Arc<Mutex<QuizOrchestrator>>;

/// Default interval between countdown ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Background countdown bound to one session generation.
///
/// Each tick asks the orchestrator for the remaining time and publishes it.
/// The task ends on its own once the generation expires, completes or is
/// replaced. Dropping the handle aborts it.
#[derive(Debug)]
pub struct CountdownHandle {
    session_id: SessionId,
    updates: watch::Receiver<TickOutcome>,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    /// Spawn the countdown for `session_id` on the current tokio runtime.
    ///
    /// When `snapshots` is set, a session completed by timeout is saved there
    /// before the `Expired` update is published.
    #[must_use]
    pub fn spawn(
        orchestrator: SharedOrchestrator,
        session_id: SessionId,
        period: Duration,
        snapshots: Option<Arc<dyn SessionSnapshotRepository>>,
    ) -> Self {
        let (tx, updates) = watch::channel(peek(&orchestrator, session_id));

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let (outcome, completed) = tick_once(&orchestrator, session_id);

                if let (Some(session), Some(repo)) = (completed, snapshots.as_ref()) {
                    let saved_at = session.ended_at().unwrap_or_else(chrono::Utc::now);
                    if let Err(err) = repo.save_snapshot(&session, saved_at).await {
                        tracing::warn!(error = %err, %session_id, "failed to persist timed-out session");
                    }
                }

                tx.send_replace(outcome);
                if !outcome.is_running() {
                    tracing::debug!(%session_id, ?outcome, "countdown finished");
                    break;
                }
            }
        });

        Self {
            session_id,
            updates,
            task,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Receiver that sees every published tick outcome.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TickOutcome> {
        self.updates.clone()
    }

    /// Latest published outcome.
    #[must_use]
    pub fn latest(&self) -> TickOutcome {
        *self.updates.borrow()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Current countdown state without side effects.
fn peek(orchestrator: &Mutex<QuizOrchestrator>, session_id: SessionId) -> TickOutcome {
    let Ok(guard) = orchestrator.lock() else {
        return TickOutcome::Stopped;
    };
    let Some(session) = guard.session() else {
        return TickOutcome::Stopped;
    };
    if session.id() != session_id || session.is_completed() {
        return TickOutcome::Stopped;
    }
    guard
        .remaining()
        .map_or(TickOutcome::Stopped, |remaining| TickOutcome::Running {
            remaining,
        })
}

/// One tick under the lock. Also returns the session when this tick
/// completed it.
fn tick_once(
    orchestrator: &Mutex<QuizOrchestrator>,
    session_id: SessionId,
) -> (TickOutcome, Option<QuizSession>) {
    let Ok(mut guard) = orchestrator.lock() else {
        tracing::error!(%session_id, "orchestrator lock poisoned; stopping countdown");
        return (TickOutcome::Stopped, None);
    };
    let outcome = guard.tick(session_id);
    let completed = match outcome {
        TickOutcome::Expired { .. } => guard.session().cloned(),
        _ => None,
    };
    (outcome, completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuizConfigDraft, QuizQuestion};
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemorySnapshotRepository;

    fn shared_with_session(minutes: i64) -> (SharedOrchestrator, SessionId) {
        let mut orch = QuizOrchestrator::new(fixed_clock());
        let question =
            QuizQuestion::new("qa", "A", vec!["x".into(), "y".into()], 1, None).unwrap();
        let id = orch
            .start(QuizConfigDraft::new(1, minutes, "Animals"), vec![question])
            .unwrap()
            .id();
        (Arc::new(Mutex::new(orch)), id)
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_running_until_expired() {
        let (orch, id) = shared_with_session(1);
        let handle = CountdownHandle::spawn(orch.clone(), id, DEFAULT_TICK_PERIOD, None);
        let mut updates = handle.subscribe();

        assert_eq!(
            handle.latest(),
            TickOutcome::Running {
                remaining: chrono::Duration::seconds(60)
            }
        );

        orch.lock()
            .unwrap()
            .advance_clock(chrono::Duration::seconds(61));
        let outcome = *updates
            .wait_for(|o| matches!(o, TickOutcome::Expired { .. }))
            .await
            .unwrap();

        assert!(matches!(outcome, TickOutcome::Expired { score } if score.percent() == 0));
        assert!(orch.lock().unwrap().session().unwrap().is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn persists_session_completed_by_timeout() {
        let (orch, id) = shared_with_session(1);
        let repo = Arc::new(InMemorySnapshotRepository::new());
        let handle = CountdownHandle::spawn(
            orch.clone(),
            id,
            DEFAULT_TICK_PERIOD,
            Some(repo.clone() as Arc<dyn SessionSnapshotRepository>),
        );
        let mut updates = handle.subscribe();

        orch.lock().unwrap().advance_clock(chrono::Duration::minutes(2));
        updates
            .wait_for(|o| matches!(o, TickOutcome::Expired { .. }))
            .await
            .unwrap();

        let saved = repo.load_snapshot(id).await.unwrap();
        assert!(saved.session.is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_generation_is_replaced() {
        let (orch, id) = shared_with_session(5);
        let handle = CountdownHandle::spawn(orch.clone(), id, DEFAULT_TICK_PERIOD, None);
        let mut updates = handle.subscribe();

        {
            let mut guard = orch.lock().unwrap();
            guard.submit().unwrap();
            guard.retake().unwrap();
        }

        updates
            .wait_for(|o| *o == TickOutcome::Stopped)
            .await
            .unwrap();
        assert!(!orch.lock().unwrap().session().unwrap().is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_cancels_countdown() {
        let (orch, id) = shared_with_session(1);
        let handle = CountdownHandle::spawn(orch.clone(), id, DEFAULT_TICK_PERIOD, None);
        drop(handle);

        orch.lock()
            .unwrap()
            .advance_clock(chrono::Duration::minutes(2));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!orch.lock().unwrap().session().unwrap().is_completed());
    }
}
