mod countdown;
mod navigation;
mod orchestrator;
mod progress;
mod runtime;
mod store;
mod timer;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use countdown::{Countdown, TimerUrgency, display_seconds, format_remaining};
pub use navigation::Navigation;
pub use orchestrator::{QuizOrchestrator, SubmitOutcome, SubmitReason, TickOutcome};
pub use progress::SessionProgress;
pub use runtime::QuizRuntime;
pub use store::SessionStore;
pub use timer::{CountdownHandle, DEFAULT_TICK_PERIOD, SharedOrchestrator};
