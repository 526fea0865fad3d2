//! Package import: state machine, decision gates, command service

pub mod coordinator;
pub mod document;
pub mod gate;
pub mod service;
pub mod state;

pub use coordinator::{ImportCoordinator, ImportSummary, PackSource, SessionEnd};
pub use document::{import_single, preview, QuizDocument};
pub use gate::{gate, Gate, GateWait};
pub use service::{LibraryCommand, LibraryService};
pub use state::{Decision, ErrorMessage, ErrorModel, ErrorScope, ImportState};
