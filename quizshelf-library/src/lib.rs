//! quizshelf-library: quiz store, package import/export and edit engine
//!
//! [`Library`] is the handle callers thread through their code. It owns the
//! database pool and resource directory and feeds every store-writing
//! command, study sessions included, to a single [`LibraryService`] task.
//! Reads go straight to the pool.

pub mod codec;
pub mod db;
pub mod edit;
pub mod error;
pub mod import;
pub mod models;
pub mod resources;

pub use crate::error::{ImportError, ImportResult};
pub use crate::import::{ImportState, ImportSummary, PackSource};

use crate::db::{dimensions, quizzes, sessions, DimensionSummary, QuizSummary, SessionSummary};
use crate::import::{LibraryCommand, LibraryService, QuizDocument};
use crate::models::{Edit, Quiz};
use crate::resources::ResourceStore;
use quizshelf_common::config::{LibraryPaths, LibrarySettings};
use quizshelf_common::events::{EventBus, LibraryEvent};
use quizshelf_common::{Clock, Error, Result, SystemClock};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Open library: store, resources, and the running command service
pub struct Library {
    pool: SqlitePool,
    resources: ResourceStore,
    events: EventBus,
    compression_level: u32,
    commands: mpsc::Sender<LibraryCommand>,
    state: watch::Receiver<ImportState>,
    service: JoinHandle<()>,
}

impl Library {
    /// Open (or create) the library under `paths` and start its service
    pub async fn open(paths: &LibraryPaths, settings: &LibrarySettings) -> Result<Self> {
        paths.ensure_exists()?;
        let pool = quizshelf_common::db::init_database(&paths.database).await?;
        info!(root = %paths.root.display(), "Library opened");
        Ok(Self::start(
            pool,
            ResourceStore::new(&paths.resources),
            settings,
            Arc::new(SystemClock),
        ))
    }

    /// Start a library over an existing pool; must run inside a tokio runtime
    pub fn start(
        pool: SqlitePool,
        resources: ResourceStore,
        settings: &LibrarySettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = EventBus::new(settings.event_capacity);
        let (commands, queue) = mpsc::channel(settings.command_capacity.max(1));
        let (state_tx, state) = watch::channel(ImportState::Idle);

        let service = LibraryService::new(
            pool.clone(),
            resources.clone(),
            events.clone(),
            clock,
            state_tx,
            queue,
        );

        Self {
            pool,
            resources,
            events,
            compression_level: settings.compression_level,
            commands,
            state,
            service: tokio::spawn(service.run()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current import state
    pub fn state(&self) -> ImportState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every import state change
    pub fn watch_state(&self) -> watch::Receiver<ImportState> {
        self.state.clone()
    }

    async fn send<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> LibraryCommand,
    ) -> Result<oneshot::Receiver<T>> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| service_stopped())?;
        Ok(rx)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> LibraryCommand,
    ) -> Result<T> {
        self.send(command).await?.await.map_err(|_| service_stopped())
    }

    /// Queue an import session
    ///
    /// Returns as soon as the command is queued. The session's decisions are
    /// answered through [`Library::watch_state`]; the receiver yields the
    /// summary once the session is back in Idle.
    pub async fn import(&self, source: PackSource) -> Result<oneshot::Receiver<ImportSummary>> {
        self.send(|reply| LibraryCommand::Import { source, reply }).await
    }

    /// Import a package holding exactly one quiz, without decisions
    pub async fn import_single(&self, data: Vec<u8>) -> ImportResult<i64> {
        self.request(|reply| LibraryCommand::ImportSingle { data, reply })
            .await?
    }

    /// Optimize and apply an edit history to one quiz
    pub async fn apply_edits(&self, quiz_id: i64, edits: Vec<Edit>) -> Result<()> {
        self.request(|reply| LibraryCommand::ApplyEdits {
            quiz_id,
            edits,
            reply,
        })
        .await?
    }

    pub async fn remove_quiz(&self, quiz_id: i64) -> Result<bool> {
        self.request(|reply| LibraryCommand::RemoveQuiz { quiz_id, reply })
            .await?
    }

    /// Remove a dimension; with `with_quizzes` its member quizzes go too
    pub async fn remove_dimension(&self, dimension_id: i64, with_quizzes: bool) -> Result<bool> {
        self.request(|reply| {
            if with_quizzes {
                LibraryCommand::RemoveDimensionWithQuizzes {
                    dimension_id,
                    reply,
                }
            } else {
                LibraryCommand::RemoveDimensionKeepQuizzes {
                    dimension_id,
                    reply,
                }
            }
        })
        .await?
    }

    pub async fn get_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>> {
        let mut conn = self.pool.acquire().await?;
        quizzes::get_quiz(&mut conn, quiz_id).await
    }

    pub async fn list_quizzes(&self) -> Result<Vec<QuizSummary>> {
        let mut conn = self.pool.acquire().await?;
        quizzes::list_quizzes(&mut conn).await
    }

    pub async fn list_dimensions(&self) -> Result<Vec<DimensionSummary>> {
        let mut conn = self.pool.acquire().await?;
        dimensions::list_dimensions(&mut conn).await
    }

    /// Decode a package without storing anything
    pub async fn preview(&self, data: Vec<u8>) -> ImportResult<Vec<QuizDocument>> {
        import::preview(data).await
    }

    /// Encode the selected quizzes and their resources as package bytes
    pub async fn export(&self, quiz_ids: &[i64]) -> Result<Vec<u8>> {
        let mut conn = self.pool.acquire().await?;
        let bytes =
            codec::encode(&mut conn, &self.resources, quiz_ids, self.compression_level).await?;
        info!(quizzes = quiz_ids.len(), size = bytes.len(), "Exported package");
        Ok(bytes)
    }

    /// Create a study session from quizzes and whole dimensions
    pub async fn create_session(
        &self,
        name: &str,
        quiz_ids: &[i64],
        dimension_ids: &[i64],
    ) -> Result<i64> {
        self.request(|reply| LibraryCommand::CreateSession {
            name: name.to_string(),
            quiz_ids: quiz_ids.to_vec(),
            dimension_ids: dimension_ids.to_vec(),
            reply,
        })
        .await?
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut conn = self.pool.acquire().await?;
        sessions::list_sessions(&mut conn).await
    }

    /// Quizzes of a session; marks the session as accessed
    pub async fn open_session(&self, session_id: i64) -> Result<Vec<i64>> {
        self.request(|reply| LibraryCommand::OpenSession { session_id, reply })
            .await?
    }

    pub async fn remove_session(&self, session_id: i64) -> Result<bool> {
        self.request(|reply| LibraryCommand::RemoveSession { session_id, reply })
            .await?
    }

    /// Stop accepting commands, let the service drain, close the pool
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.service.await {
            warn!(error = %e, "Library service ended abnormally");
        }
        self.pool.close().await;
        info!("Library closed");
    }
}

fn service_stopped() -> Error {
    Error::Internal("library service is not running".to_string())
}
