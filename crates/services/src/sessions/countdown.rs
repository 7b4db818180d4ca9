use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{QuizSession, SessionId};

/// Deadline of one session generation.
///
/// Remaining time is always derived from the fixed deadline and the caller's
/// "now", never decremented, so missed or late ticks cannot drift it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    session_id: SessionId,
    deadline: DateTime<Utc>,
}

impl Countdown {
    /// Countdown for `session`, or `None` if it has no start anchor.
    #[must_use]
    pub fn for_session(session: &QuizSession) -> Option<Self> {
        Some(Self {
            session_id: session.id(),
            deadline: session.deadline()?,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// `max(0, deadline - now)`.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline - now).max(Duration::zero())
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

/// How close a countdown is to running out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerUrgency {
    Calm,
    Warning,
    Critical,
}

impl TimerUrgency {
    pub const WARNING_SECS: i64 = 300;
    pub const CRITICAL_SECS: i64 = 60;

    #[must_use]
    pub fn for_remaining(remaining: Duration) -> Self {
        let secs = display_seconds(remaining);
        if secs <= Self::CRITICAL_SECS {
            Self::Critical
        } else if secs <= Self::WARNING_SECS {
            Self::Warning
        } else {
            Self::Calm
        }
    }
}

/// Whole seconds shown for `remaining`, rounded up so the display only reads
/// zero once time is actually out.
#[must_use]
pub fn display_seconds(remaining: Duration) -> i64 {
    let millis = remaining.num_milliseconds().max(0);
    (millis + 999) / 1000
}

/// Formats remaining time as `MM:SS`. Minutes are not capped at 59.
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let secs = display_seconds(remaining);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
