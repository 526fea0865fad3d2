//! Store queries over the library schema
//!
//! Schema creation and migrations live in `quizshelf_common::db`.

pub mod dimensions;
pub mod frames;
pub mod quizzes;
pub mod sessions;

pub use dimensions::DimensionSummary;
pub use quizzes::QuizSummary;
pub use sessions::SessionSummary;
