mod config;
mod ids;
mod question;
mod session;

pub use config::{QuizConfig, QuizConfigDraft, QuizConfigError};
pub use ids::{ParseSessionIdError, QuestionId, SessionId};
pub use question::{QuestionError, QuizQuestion, ensure_unique_ids};
pub use session::{QuizSession, SessionStateError, SessionStatus};
