#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod report;
pub mod scoring;
pub mod time;

pub use error::QuizError;
pub use time::Clock;
