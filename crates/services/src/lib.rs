#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::{AppServicesError, SessionError};

pub use sessions::{
    Countdown, CountdownHandle, Navigation, QuizOrchestrator, QuizRuntime, SessionProgress,
    SessionStore, SubmitOutcome, SubmitReason, TickOutcome, TimerUrgency,
};
