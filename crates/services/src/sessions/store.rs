use quiz_core::model::{QuizSession, SessionStateError};

/// Holds the one current session and guards every write.
///
/// Writes replace the whole value. A replacement that breaks a session
/// invariant panics in debug builds; release builds refuse it and keep the
/// previous value.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: Option<QuizSession>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> Option<&QuizSession> {
        self.current.as_ref()
    }

    /// Replace the current session with `mutator(current)`.
    ///
    /// Returns `false` without calling `mutator` when there is no session, and
    /// `false` when the produced value is refused.
    pub fn apply<F>(&mut self, mutator: F) -> bool
    where
        F: FnOnce(&QuizSession) -> QuizSession,
    {
        let Some(prev) = self.current.as_ref() else {
            return false;
        };
        let next = mutator(prev);

        let checked = next
            .check_invariants()
            .and_then(|()| QuizSession::check_transition(prev, &next));
        if let Err(err) = checked {
            return refuse(&err);
        }

        self.current = Some(next);
        true
    }

    /// Set or clear the current session.
    ///
    /// Returns `false` if `session` breaks an invariant; the previous value is
    /// kept in that case.
    pub fn replace(&mut self, session: Option<QuizSession>) -> bool {
        if let Some(next) = session.as_ref() {
            if let Err(err) = next.check_invariants() {
                return refuse(&err);
            }
        }
        self.current = session;
        true
    }

    /// Clear the store, returning what it held.
    pub fn take(&mut self) -> Option<QuizSession> {
        self.current.take()
    }
}

fn refuse(err: &SessionStateError) -> bool {
    if cfg!(debug_assertions) {
        panic!("session invariant violated: {err}");
    }
    tracing::error!(error = %err, "refusing session write that breaks an invariant");
    false
}
