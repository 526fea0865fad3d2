//! Single-consumer library service
//!
//! Every store-writing command goes through one mpsc queue and is handled to
//! completion before the next is received, so no two write transactions are
//! ever open at once. An import session holds the queue while it waits for
//! decisions; commands sent meanwhile wait their turn.

use super::coordinator::{ImportCoordinator, ImportSummary, PackSource};
use super::document;
use super::state::ImportState;
use crate::db::{dimensions, quizzes, sessions};
use crate::edit::{apply, optimize};
use crate::error::ImportResult;
use crate::models::Edit;
use crate::resources::{resources_of, ResourceSet, ResourceStore};
use quizshelf_common::events::{EventBus, LibraryEvent};
use quizshelf_common::{Clock, Error, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

/// Commands accepted by the library service
#[derive(Debug)]
pub enum LibraryCommand {
    Import {
        source: PackSource,
        reply: oneshot::Sender<ImportSummary>,
    },
    ImportSingle {
        data: Vec<u8>,
        reply: oneshot::Sender<ImportResult<i64>>,
    },
    /// Raw edit history; optimized before it is applied
    ApplyEdits {
        quiz_id: i64,
        edits: Vec<Edit>,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveQuiz {
        quiz_id: i64,
        reply: oneshot::Sender<Result<bool>>,
    },
    RemoveDimensionKeepQuizzes {
        dimension_id: i64,
        reply: oneshot::Sender<Result<bool>>,
    },
    RemoveDimensionWithQuizzes {
        dimension_id: i64,
        reply: oneshot::Sender<Result<bool>>,
    },
    /// Study session from whole quizzes and whole dimensions
    CreateSession {
        name: String,
        quiz_ids: Vec<i64>,
        dimension_ids: Vec<i64>,
        reply: oneshot::Sender<Result<i64>>,
    },
    /// Mark a session accessed and list its quizzes
    OpenSession {
        session_id: i64,
        reply: oneshot::Sender<Result<Vec<i64>>>,
    },
    RemoveSession {
        session_id: i64,
        reply: oneshot::Sender<Result<bool>>,
    },
}

impl LibraryCommand {
    fn name(&self) -> &'static str {
        match self {
            LibraryCommand::Import { .. } => "import",
            LibraryCommand::ImportSingle { .. } => "import_single",
            LibraryCommand::ApplyEdits { .. } => "apply_edits",
            LibraryCommand::RemoveQuiz { .. } => "remove_quiz",
            LibraryCommand::RemoveDimensionKeepQuizzes { .. } => "remove_dimension",
            LibraryCommand::RemoveDimensionWithQuizzes { .. } => "remove_dimension_with_quizzes",
            LibraryCommand::CreateSession { .. } => "create_session",
            LibraryCommand::OpenSession { .. } => "open_session",
            LibraryCommand::RemoveSession { .. } => "remove_session",
        }
    }
}

/// Consumer side of the command queue
pub struct LibraryService {
    pool: SqlitePool,
    resources: ResourceStore,
    events: EventBus,
    clock: Arc<dyn Clock>,
    state: watch::Sender<ImportState>,
    commands: mpsc::Receiver<LibraryCommand>,
}

impl LibraryService {
    pub fn new(
        pool: SqlitePool,
        resources: ResourceStore,
        events: EventBus,
        clock: Arc<dyn Clock>,
        state: watch::Sender<ImportState>,
        commands: mpsc::Receiver<LibraryCommand>,
    ) -> Self {
        Self {
            pool,
            resources,
            events,
            clock,
            state,
            commands,
        }
    }

    /// Handle commands until every sender is gone
    pub async fn run(mut self) {
        info!("Library service started");
        while let Some(command) = self.commands.recv().await {
            debug!(command = command.name(), "Handling command");
            self.handle(command).await;
        }
        info!("Library service stopped");
    }

    async fn handle(&self, command: LibraryCommand) {
        // A dropped reply receiver only means the caller stopped waiting
        match command {
            LibraryCommand::Import { source, reply } => {
                let coordinator = ImportCoordinator::new(
                    &self.pool,
                    &self.resources,
                    &self.events,
                    self.clock.as_ref(),
                    &self.state,
                );
                let _ = reply.send(coordinator.run(source).await);
            }
            LibraryCommand::ImportSingle { data, reply } => {
                let _ = reply.send(document::import_single(&self.pool, &self.resources, data).await);
            }
            LibraryCommand::ApplyEdits {
                quiz_id,
                edits,
                reply,
            } => {
                let optimized = optimize(&edits);
                debug!(quiz_id, raw = edits.len(), optimized = optimized.len(), "Optimized edits");
                let _ = reply.send(apply(&self.pool, quiz_id, &optimized, self.clock.as_ref()).await);
            }
            LibraryCommand::RemoveQuiz { quiz_id, reply } => {
                let _ = reply.send(self.remove_quiz(quiz_id).await);
            }
            LibraryCommand::RemoveDimensionKeepQuizzes {
                dimension_id,
                reply,
            } => {
                let _ = reply.send(self.remove_dimension(dimension_id, false).await);
            }
            LibraryCommand::RemoveDimensionWithQuizzes {
                dimension_id,
                reply,
            } => {
                let _ = reply.send(self.remove_dimension(dimension_id, true).await);
            }
            LibraryCommand::CreateSession {
                name,
                quiz_ids,
                dimension_ids,
                reply,
            } => {
                let _ = reply.send(self.create_session(&name, &quiz_ids, &dimension_ids).await);
            }
            LibraryCommand::OpenSession { session_id, reply } => {
                let _ = reply.send(self.open_session(session_id).await);
            }
            LibraryCommand::RemoveSession { session_id, reply } => {
                let _ = reply.send(self.remove_session(session_id).await);
            }
        }
    }

    async fn create_session(
        &self,
        name: &str,
        quiz_ids: &[i64],
        dimension_ids: &[i64],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let id = sessions::create_session(&mut *tx, name, quiz_ids, dimension_ids, self.clock.now())
            .await?;
        tx.commit().await?;
        info!(session_id = id, "Created study session");
        Ok(id)
    }

    async fn open_session(&self, session_id: i64) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        if !sessions::touch_session(&mut *tx, session_id, self.clock.now()).await? {
            return Err(Error::NotFound(format!("session {}", session_id)));
        }
        let ids = sessions::quizzes_in_session(&mut *tx, session_id).await?;
        tx.commit().await?;
        Ok(ids)
    }

    async fn remove_session(&self, session_id: i64) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        sessions::remove_session(&mut conn, session_id).await
    }

    /// Delete a quiz's rows in one transaction, then its resource files
    ///
    /// Files go only after the commit; a failed delete leaves an orphan
    /// file, never a quiz pointing at a missing one.
    async fn remove_quiz(&self, quiz_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let Some(quiz) = quizzes::get_quiz(&mut *tx, quiz_id).await? else {
            return Ok(false);
        };

        let files = resources_of(&quiz);
        quizzes::remove_quiz(&mut *tx, quiz_id).await?;
        tx.commit().await?;
        let deleted = files.delete_all(&self.resources).await;

        info!(quiz_id, files = deleted, "Removed quiz");
        self.events.emit_lossy(LibraryEvent::QuizRemoved {
            quiz_id,
            timestamp: self.clock.now(),
        });
        Ok(true)
    }

    async fn remove_dimension(&self, dimension_id: i64, with_quizzes: bool) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let mut removed_quizzes = Vec::new();
        let mut files = Vec::new();
        if with_quizzes {
            for quiz_id in dimensions::quizzes_in_dimension(&mut *tx, dimension_id).await? {
                if let Some(quiz) = quizzes::get_quiz(&mut *tx, quiz_id).await? {
                    files.extend(resources_of(&quiz).names().iter().cloned());
                }
                quizzes::remove_quiz(&mut *tx, quiz_id).await?;
                removed_quizzes.push(quiz_id);
            }
        }

        let removed = dimensions::remove_dimension(&mut *tx, dimension_id).await?;
        tx.commit().await?;
        ResourceSet::from_names(files)
            .delete_all(&self.resources)
            .await;

        if !removed {
            return Ok(false);
        }

        info!(dimension_id, with_quizzes, quizzes = removed_quizzes.len(), "Removed dimension");
        let now = self.clock.now();
        for quiz_id in removed_quizzes {
            self.events.emit_lossy(LibraryEvent::QuizRemoved {
                quiz_id,
                timestamp: now,
            });
        }
        self.events.emit_lossy(LibraryEvent::DimensionRemoved {
            dimension_id,
            with_quizzes,
            timestamp: now,
        });
        Ok(true)
    }
}
