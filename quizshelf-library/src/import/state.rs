//! Import state machine states
//!
//! Idle → Unarchiving → Confirmation → Importing → Idle, with Error states
//! wherever a decision is needed. Exactly one state is current; it is
//! published on a `watch` channel and observers answer pending decisions by
//! firing the gates carried by the state.

use super::gate::Gate;
use crate::error::ImportError;
use std::fmt;
use std::sync::Arc;

/// Current import state
#[derive(Debug, Clone, Default)]
pub enum ImportState {
    /// No session running
    #[default]
    Idle,

    /// Decoding the named package
    Unarchiving { target: String },

    /// Package decoded; waiting for the user to confirm or dismiss
    Confirmation { total: usize, ok: Gate, dismiss: Gate },

    /// Quizzes being written, `done` of `total` processed
    Importing { total: usize, done: usize },

    /// A failure waiting for a decision; only offered gates are `Some`
    Error {
        model: ErrorModel,
        cancel: Gate,
        retry: Option<Gate>,
        skip: Option<Gate>,
        ignore: Option<Gate>,
    },
}

impl ImportState {
    pub fn name(&self) -> &'static str {
        match self {
            ImportState::Idle => "idle",
            ImportState::Unarchiving { .. } => "unarchiving",
            ImportState::Confirmation { .. } => "confirmation",
            ImportState::Importing { .. } => "importing",
            ImportState::Error { .. } => "error",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ImportState::Idle)
    }
}

/// Where in the session a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Decoding the package; fatal to the session
    Unarchive,
    /// Writing one quiz; recoverable per quiz
    Import,
}

/// User-facing description of a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorMessage {
    InvalidFileFormat,
    ResourceNotFound { resource: String, requester: String },
    CopyResource { resource: String, requester: String },
    Store { quiz: String },
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMessage::InvalidFileFormat => {
                write!(f, "The file is not a valid quiz package")
            }
            ErrorMessage::ResourceNotFound {
                resource,
                requester,
            } => write!(
                f,
                "The resource '{}' used by {} is missing from the package",
                resource, requester
            ),
            ErrorMessage::CopyResource {
                resource,
                requester,
            } => write!(
                f,
                "The resource '{}' used by {} could not be saved",
                resource, requester
            ),
            ErrorMessage::Store { quiz } => {
                write!(f, "The library could not store {}", quiz)
            }
        }
    }
}

/// Everything a caller needs to render an Error state
#[derive(Debug, Clone)]
pub struct ErrorModel {
    pub scope: ErrorScope,
    pub message: ErrorMessage,
    pub cause: Arc<ImportError>,
}

impl ErrorModel {
    pub fn new(scope: ErrorScope, message: ErrorMessage, cause: ImportError) -> Self {
        Self {
            scope,
            message,
            cause: Arc::new(cause),
        }
    }
}

/// Outcome of a gate race in an Error state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Cancel,
    Retry,
    Skip,
    Ignore,
}
