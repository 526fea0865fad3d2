//! Import session orchestration
//!
//! One session runs unarchive → confirm → per-quiz import → idle. Each quiz
//! is written in its own transaction, so a bad quiz only ever costs itself:
//! quizzes committed earlier in the session stay committed whatever the user
//! decides later, including on cancel.
//!
//! The coordinator suspends only while decoding, while writing (store and
//! resource files) and while waiting for a decision. Decisions have no
//! timeout.

use super::gate::{gate, wait_optional};
use super::state::{Decision, ErrorMessage, ErrorModel, ErrorScope, ImportState};
use crate::codec;
use crate::edit::insert_quiz;
use crate::error::{ImportError, ImportResult};
use crate::models::{Pack, QuizArchive};
use crate::resources::{required_resources, ResourceRequest, ResourceSet, ResourceStore};
use quizshelf_common::events::{EventBus, LibraryEvent};
use quizshelf_common::Clock;
use sqlx::SqlitePool;
use std::path::Path;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Raw package bytes plus a display name for the Unarchiving state
#[derive(Debug, Clone)]
pub struct PackSource {
    pub name: String,
    pub data: Vec<u8>,
}

impl PackSource {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Read a package file; its file name becomes the source name
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, data })
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Every quiz was processed (committed or skipped)
    Completed,
    /// Dismissed at confirmation; nothing written
    Dismissed,
    /// Cancelled at a per-quiz decision; earlier commits kept
    Cancelled,
    /// The package could not be decoded
    Unreadable,
}

/// Result of one import session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub session_id: Uuid,
    /// Ids of committed quizzes, in package order
    pub imported: Vec<i64>,
    pub skipped: usize,
    pub end: SessionEnd,
}

enum QuizOutcome {
    Committed(i64),
    Skipped,
    Cancelled,
}

/// Gates offered next to the always-present cancel gate
#[derive(Debug, Clone, Copy, Default)]
struct Offer {
    retry: bool,
    skip: bool,
    ignore: bool,
}

impl Offer {
    const CANCEL_ONLY: Offer = Offer {
        retry: false,
        skip: false,
        ignore: false,
    };
    const RESOURCE: Offer = Offer {
        retry: false,
        skip: true,
        ignore: true,
    };
    const STORE: Offer = Offer {
        retry: true,
        skip: true,
        ignore: false,
    };
}

/// Runs import sessions against one store
///
/// Sessions must not overlap; the library service guarantees this by running
/// them from its single command consumer.
pub struct ImportCoordinator<'a> {
    pool: &'a SqlitePool,
    resources: &'a ResourceStore,
    events: &'a EventBus,
    clock: &'a dyn Clock,
    state: &'a watch::Sender<ImportState>,
}

/// Per-session bookkeeping
struct Session {
    id: Uuid,
    total: usize,
}

impl<'a> ImportCoordinator<'a> {
    pub fn new(
        pool: &'a SqlitePool,
        resources: &'a ResourceStore,
        events: &'a EventBus,
        clock: &'a dyn Clock,
        state: &'a watch::Sender<ImportState>,
    ) -> Self {
        Self {
            pool,
            resources,
            events,
            clock,
            state,
        }
    }

    fn publish(&self, state: ImportState) {
        debug!(state = state.name(), "Import state");
        self.state.send_replace(state);
    }

    /// Run one full session; always ends in Idle
    pub async fn run(&self, source: PackSource) -> ImportSummary {
        let session_id = Uuid::new_v4();
        info!(session_id = %session_id, source = %source.name, size = source.data.len(), "Import session started");

        let summary = self.run_session(session_id, source).await;
        self.publish(ImportState::Idle);

        info!(
            session_id = %session_id,
            imported = summary.imported.len(),
            skipped = summary.skipped,
            end = ?summary.end,
            "Import session finished"
        );
        self.events.emit_lossy(LibraryEvent::ImportFinished {
            session_id,
            imported: summary.imported.len(),
            skipped: summary.skipped,
            cancelled: summary.end != SessionEnd::Completed,
            timestamp: self.clock.now(),
        });
        summary
    }

    async fn run_session(&self, session_id: Uuid, source: PackSource) -> ImportSummary {
        let mut summary = ImportSummary {
            session_id,
            imported: Vec::new(),
            skipped: 0,
            end: SessionEnd::Completed,
        };

        self.publish(ImportState::Unarchiving {
            target: source.name.clone(),
        });
        let pack = match codec::decode_blocking(source.data).await {
            Ok(pack) => pack,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Package rejected");
                let model = ErrorModel::new(ErrorScope::Unarchive, ErrorMessage::InvalidFileFormat, e);
                self.decide(model, Offer::CANCEL_ONLY).await;
                summary.end = SessionEnd::Unreadable;
                return summary;
            }
        };

        let session = Session {
            id: session_id,
            total: pack.quizzes.len(),
        };
        if !self.confirm(session.total).await {
            info!(session_id = %session_id, "Import dismissed at confirmation");
            summary.end = SessionEnd::Dismissed;
            return summary;
        }

        for (index, archive) in pack.quizzes.iter().enumerate() {
            self.publish(ImportState::Importing {
                total: session.total,
                done: index,
            });
            match self.import_quiz(&session, index, archive, &pack).await {
                QuizOutcome::Committed(quiz_id) => summary.imported.push(quiz_id),
                QuizOutcome::Skipped => summary.skipped += 1,
                QuizOutcome::Cancelled => {
                    summary.end = SessionEnd::Cancelled;
                    return summary;
                }
            }
        }
        self.publish(ImportState::Importing {
            total: session.total,
            done: session.total,
        });
        summary
    }

    async fn confirm(&self, total: usize) -> bool {
        let (ok, ok_wait) = gate();
        let (dismiss, dismiss_wait) = gate();
        self.publish(ImportState::Confirmation { total, ok, dismiss });

        tokio::select! {
            _ = ok_wait.wait() => true,
            _ = dismiss_wait.wait() => false,
        }
    }

    /// Publish an Error state and race its gates
    async fn decide(&self, model: ErrorModel, offer: Offer) -> Decision {
        let (cancel, cancel_wait) = gate();
        let (retry, retry_wait) = offer.retry.then(gate).unzip();
        let (skip, skip_wait) = offer.skip.then(gate).unzip();
        let (ignore, ignore_wait) = offer.ignore.then(gate).unzip();

        self.publish(ImportState::Error {
            model,
            cancel,
            retry,
            skip,
            ignore,
        });

        let decision = tokio::select! {
            _ = cancel_wait.wait() => Decision::Cancel,
            _ = wait_optional(retry_wait) => Decision::Retry,
            _ = wait_optional(skip_wait) => Decision::Skip,
            _ = wait_optional(ignore_wait) => Decision::Ignore,
        };
        debug!(decision = ?decision, "Decision received");
        decision
    }

    /// Import one quiz, offering retry on store failures
    async fn import_quiz(
        &self,
        session: &Session,
        index: usize,
        archive: &QuizArchive,
        pack: &Pack,
    ) -> QuizOutcome {
        loop {
            let mut copied = Vec::new();
            let error = match self.write_quiz(session, index, archive, pack, &mut copied).await {
                Ok(outcome) => return outcome,
                Err(e) => e,
            };

            error!(session_id = %session.id, quiz_index = index, error = %error, "Quiz transaction failed");
            self.discard(&copied).await;

            let quiz = archive
                .name
                .as_deref()
                .map(|n| format!("quiz '{}'", n))
                .unwrap_or_else(|| format!("quiz {} of the package", index + 1));
            let model = ErrorModel::new(ErrorScope::Import, ErrorMessage::Store { quiz }, error);
            match self.decide(model, Offer::STORE).await {
                Decision::Retry => {
                    info!(session_id = %session.id, quiz_index = index, "Retrying quiz");
                    self.publish(ImportState::Importing {
                        total: session.total,
                        done: index,
                    });
                }
                Decision::Skip | Decision::Ignore => return QuizOutcome::Skipped,
                Decision::Cancel => return QuizOutcome::Cancelled,
            }
        }
    }

    /// One transaction: insert rows, copy resources, commit
    ///
    /// Store failures come back as `Err` with the transaction rolled back;
    /// files copied so far are listed in `copied` for the caller to discard.
    async fn write_quiz(
        &self,
        session: &Session,
        index: usize,
        archive: &QuizArchive,
        pack: &Pack,
        copied: &mut Vec<String>,
    ) -> ImportResult<QuizOutcome> {
        let mut tx = self.pool.begin().await?;
        let quiz = insert_quiz(&mut *tx, archive).await?;

        for request in required_resources(&quiz.frames, &quiz.display_name()) {
            loop {
                let (message, error) = match self.copy_resource(&request, pack, copied).await {
                    Ok(()) => break,
                    Err(failure) => failure,
                };
                warn!(
                    session_id = %session.id,
                    quiz_index = index,
                    resource = %request.name,
                    error = %error,
                    "Resource unavailable"
                );

                let model = ErrorModel::new(ErrorScope::Import, message, error);
                match self.decide(model, Offer::RESOURCE).await {
                    Decision::Ignore => {
                        warn!(session_id = %session.id, resource = %request.name, "Leaving reference unresolved");
                        self.publish(ImportState::Importing {
                            total: session.total,
                            done: index,
                        });
                        break;
                    }
                    Decision::Retry => continue,
                    Decision::Skip => {
                        self.abort(tx, copied).await;
                        info!(session_id = %session.id, quiz_index = index, "Quiz skipped");
                        return Ok(QuizOutcome::Skipped);
                    }
                    Decision::Cancel => {
                        self.abort(tx, copied).await;
                        info!(session_id = %session.id, quiz_index = index, "Import cancelled");
                        return Ok(QuizOutcome::Cancelled);
                    }
                }
            }
        }

        tx.commit().await?;
        info!(session_id = %session.id, quiz_index = index, quiz_id = quiz.id, "Quiz imported");
        self.events.emit_lossy(LibraryEvent::QuizImported {
            session_id: session.id,
            quiz_id: quiz.id,
            name: quiz.name.clone(),
            timestamp: self.clock.now(),
        });
        Ok(QuizOutcome::Committed(quiz.id))
    }

    /// Make one resource available in the store
    ///
    /// A file already in the store is left alone and not tracked, since it
    /// belongs to an earlier quiz. Fresh copies are appended to `copied`.
    async fn copy_resource(
        &self,
        request: &ResourceRequest,
        pack: &Pack,
        copied: &mut Vec<String>,
    ) -> Result<(), (ErrorMessage, ImportError)> {
        let write_failure = |source: std::io::Error| {
            (
                ErrorMessage::CopyResource {
                    resource: request.name.clone(),
                    requester: request.requester.clone(),
                },
                ImportError::ResourceWrite {
                    resource: request.name.clone(),
                    source,
                },
            )
        };

        if self.resources.exists(&request.name).await.map_err(write_failure)? {
            return Ok(());
        }

        let Some(source) = pack.resources.get(&request.name) else {
            return Err((
                ErrorMessage::ResourceNotFound {
                    resource: request.name.clone(),
                    requester: request.requester.clone(),
                },
                ImportError::ResourceMissing {
                    resource: request.name.clone(),
                    requester: request.requester.clone(),
                },
            ));
        };

        let bytes = source.read().map_err(write_failure)?;
        self.resources
            .write(&request.name, &bytes)
            .await
            .map_err(write_failure)?;
        copied.push(request.name.clone());
        Ok(())
    }

    async fn abort(&self, tx: sqlx::Transaction<'_, sqlx::Sqlite>, copied: &[String]) {
        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "Rollback failed; transaction dropped");
        }
        self.discard(copied).await;
    }

    async fn discard(&self, copied: &[String]) {
        if copied.is_empty() {
            return;
        }
        let removed = ResourceSet::from_names(copied.iter().cloned())
            .delete_all(self.resources)
            .await;
        debug!(removed, "Discarded copied resources");
    }
}
