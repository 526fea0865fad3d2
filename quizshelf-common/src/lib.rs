//! # Quizshelf Common Library
//!
//! Shared code for the quizshelf workspace:
//! - Error type shared by store and service layers
//! - Configuration loading and root folder resolution
//! - Clock abstraction for creation/modification stamps
//! - Library event types and the broadcast EventBus
//! - SQLite bootstrap (schema creation and versioned migrations)

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, FixedClock, SystemClock};
