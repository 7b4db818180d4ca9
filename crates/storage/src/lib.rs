#![forbid(unsafe_code)]

pub mod question_bank;
pub mod repository;
pub mod sqlite;

pub use question_bank::InMemoryQuestionBank;
pub use repository::{
    InMemorySnapshotRepository, QuestionBank, SessionSnapshot, SessionSnapshotRepository, Storage,
    StorageError,
};
