//! Package preview and single-quiz import
//!
//! Neither goes through the state machine: preview never touches the store,
//! and single-quiz import has no one to ask, so any missing resource fails it.

use crate::codec;
use crate::edit::insert_quiz;
use crate::error::{ImportError, ImportResult};
use crate::models::{materialize_frames, DimensionArchive, Frame, Pack, ResourceSource};
use crate::resources::{required_resources, ResourceSet, ResourceStore};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// A decoded quiz with the resources its frames reference
#[derive(Debug, Clone, PartialEq)]
pub struct QuizDocument {
    pub name: Option<String>,
    /// Ids assigned depth-first from 0
    pub frames: Vec<Frame>,
    pub dimensions: Vec<DimensionArchive>,
    pub creation_time: DateTime<Utc>,
    pub modification_time: Option<DateTime<Utc>>,
    /// Referenced resources present in the package
    pub resources: BTreeMap<String, ResourceSource>,
}

/// Split a decoded pack into per-quiz documents
pub fn documents(pack: Pack) -> Vec<QuizDocument> {
    let Pack { quizzes, resources } = pack;
    quizzes
        .into_iter()
        .map(|quiz| {
            let frames = materialize_frames(&quiz.frames, 0);
            let owner = quiz.name.clone().unwrap_or_default();
            let used = required_resources(&frames, &owner)
                .into_iter()
                .filter_map(|r| resources.get(&r.name).map(|s| (r.name, s.clone())))
                .collect();
            QuizDocument {
                name: quiz.name,
                frames,
                dimensions: quiz.dimensions,
                creation_time: quiz.creation_time,
                modification_time: quiz.modification_time,
                resources: used,
            }
        })
        .collect()
}

/// Decode a package for display without storing anything
pub async fn preview(bytes: Vec<u8>) -> ImportResult<Vec<QuizDocument>> {
    Ok(documents(codec::decode_blocking(bytes).await?))
}

/// Import a package holding exactly one quiz; returns the new quiz id
///
/// Any missing resource or failed copy rolls the quiz back and removes the
/// files copied for it.
pub async fn import_single(
    pool: &SqlitePool,
    resources: &ResourceStore,
    bytes: Vec<u8>,
) -> ImportResult<i64> {
    let pack = codec::decode_blocking(bytes).await?;
    let archive = match pack.quizzes.as_slice() {
        [] => return Err(ImportError::EmptyArchive),
        [archive] => archive,
        many => return Err(ImportError::MultipleQuizzes(many.len())),
    };

    let mut tx = pool.begin().await?;
    let quiz = insert_quiz(&mut *tx, archive).await?;

    let mut copied = Vec::new();
    let mut failure = None;
    for request in required_resources(&quiz.frames, &quiz.display_name()) {
        match copy_single(resources, &pack, &request.name, &request.requester).await {
            Ok(Some(name)) => copied.push(name),
            Ok(None) => {}
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let committed = match failure {
        None => tx.commit().await.map_err(ImportError::from),
        Some(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed; transaction dropped");
            }
            Err(e)
        }
    };

    if let Err(e) = committed {
        ResourceSet::from_names(copied).delete_all(resources).await;
        return Err(e);
    }

    info!(quiz_id = quiz.id, "Single quiz imported");
    Ok(quiz.id)
}

/// Copy one resource; returns its name when a new file was written
async fn copy_single(
    resources: &ResourceStore,
    pack: &Pack,
    name: &str,
    requester: &str,
) -> ImportResult<Option<String>> {
    let write_failure = |source: std::io::Error| ImportError::ResourceWrite {
        resource: name.to_string(),
        source,
    };

    if resources.exists(name).await.map_err(write_failure)? {
        return Ok(None);
    }
    let source = pack
        .resources
        .get(name)
        .ok_or_else(|| ImportError::ResourceMissing {
            resource: name.to_string(),
            requester: requester.to_string(),
        })?;
    let bytes = source.read().map_err(write_failure)?;
    resources.write(name, &bytes).await.map_err(write_failure)?;
    Ok(Some(name.to_string()))
}
