//! Event types for the library event system
//!
//! Provides shared event definitions and the EventBus used by the library
//! service to announce committed changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Library event types
///
/// Only committed changes are announced; an aborted quiz transaction never
/// produces an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LibraryEvent {
    /// A quiz transaction from an import session committed
    QuizImported {
        session_id: Uuid,
        quiz_id: i64,
        name: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A quiz and its resource files were removed
    QuizRemoved {
        quiz_id: i64,
        timestamp: DateTime<Utc>,
    },

    /// A dimension was removed
    DimensionRemoved {
        dimension_id: i64,
        /// Whether member quizzes were removed with it
        with_quizzes: bool,
        timestamp: DateTime<Utc>,
    },

    /// An import session returned to idle
    ImportFinished {
        session_id: Uuid,
        /// Quizzes committed during the session
        imported: usize,
        /// Quizzes skipped by user decision
        skipped: usize,
        /// False only when every quiz was processed
        cancelled: bool,
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus for library events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use quizshelf_common::events::{EventBus, LibraryEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(LibraryEvent::QuizRemoved {
///     quiz_id: 7,
///     timestamp: chrono::Utc::now(),
/// });
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LibraryEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LibraryEvent,
    ) -> Result<usize, broadcast::error::SendError<LibraryEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: LibraryEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
