//! Package byte format
//!
//! A package is a gzip stream wrapping one JSON document:
//!
//! ```text
//! { "format": "quizshelf-archive", "version": 1,
//!   "quizzes": [ ... ], "resources": { "<name>": "<base64>" } }
//! ```
//!
//! Decoding is pure computation over bytes; it never touches the store or
//! the resource directory.

use crate::db::quizzes;
use crate::error::{ImportError, ImportResult};
use crate::models::{Pack, ResourceSource};
use crate::resources::{required_resources, ResourceStore};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use quizshelf_common::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqliteConnection;
use std::io::{BufReader, Read};
use tracing::{debug, warn};

/// Format marker every package must carry
pub const FORMAT_MARKER: &str = "quizshelf-archive";

/// Container version written by this build; other versions are rejected
pub const FORMAT_VERSION: u64 = 1;

#[derive(Serialize)]
struct PackFile<'a> {
    format: &'static str,
    version: u64,
    #[serde(flatten)]
    pack: &'a Pack,
}

/// Decode a package from a byte stream
pub fn decode_reader<R: Read>(reader: R) -> ImportResult<Pack> {
    let decoder = BufReader::new(GzDecoder::new(reader));
    let document: Value = serde_json::from_reader(decoder).map_err(|e| {
        if e.is_io() {
            ImportError::Format(format!("decompression failed: {}", e))
        } else {
            ImportError::Format(format!("malformed package document: {}", e))
        }
    })?;

    match document.get("format").and_then(Value::as_str) {
        Some(FORMAT_MARKER) => {}
        Some(other) => {
            return Err(ImportError::Format(format!("unknown package format '{}'", other)));
        }
        None => return Err(ImportError::Format("missing format marker".to_string())),
    }

    match document.get("version").and_then(Value::as_u64) {
        Some(FORMAT_VERSION) => {}
        Some(other) => {
            return Err(ImportError::Format(format!(
                "unsupported package version {} (expected {})",
                other, FORMAT_VERSION
            )));
        }
        None => return Err(ImportError::Format("missing package version".to_string())),
    }

    let pack: Pack = serde_json::from_value(document)
        .map_err(|e| ImportError::Format(format!("malformed package structure: {}", e)))?;

    debug!(
        quizzes = pack.quizzes.len(),
        resources = pack.resources.len(),
        "Decoded package"
    );
    Ok(pack)
}

pub fn decode(bytes: &[u8]) -> ImportResult<Pack> {
    decode_reader(bytes)
}

/// Decode on the blocking pool; decompression is CPU-bound
pub async fn decode_blocking(bytes: Vec<u8>) -> ImportResult<Pack> {
    tokio::task::spawn_blocking(move || decode(&bytes))
        .await
        .map_err(|e| ImportError::Format(format!("decoder task failed: {}", e)))?
}

/// Serialize and compress a pack
pub fn encode_pack(pack: &Pack, level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    serde_json::to_writer(
        &mut encoder,
        &PackFile {
            format: FORMAT_MARKER,
            version: FORMAT_VERSION,
            pack,
        },
    )?;
    encoder.finish()
}

/// Build a pack from stored quizzes and the files they reference
///
/// Quizzes are emitted in ascending id order. Frames follow the quiz's
/// stored `(priority, id)` order rather than bare row-id order, so frames
/// inserted by edits keep their place through a round trip. Referenced
/// resources missing on disk are left out.
pub async fn collect_pack(
    conn: &mut SqliteConnection,
    resources: &ResourceStore,
    quiz_ids: &[i64],
) -> Result<Pack> {
    let mut ids = quiz_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let mut pack = Pack::default();
    for id in ids {
        let quiz = quizzes::get_quiz(conn, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("quiz {}", id)))?;

        for request in required_resources(&quiz.frames, &quiz.display_name()) {
            if pack.resources.contains_key(&request.name) {
                continue;
            }
            match resources.read(&request.name).await {
                Ok(bytes) => {
                    pack.resources
                        .insert(request.name, ResourceSource::from_bytes(&bytes));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(
                        resource = %request.name,
                        requester = %request.requester,
                        "Resource missing on disk, leaving it out of the package"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        pack.quizzes.push(quiz.to_archive());
    }
    Ok(pack)
}

/// Encode the selected quizzes into package bytes
pub async fn encode(
    conn: &mut SqliteConnection,
    resources: &ResourceStore,
    quiz_ids: &[i64],
    level: u32,
) -> Result<Vec<u8>> {
    let pack = collect_pack(conn, resources, quiz_ids).await?;
    let bytes = tokio::task::spawn_blocking(move || encode_pack(&pack, level))
        .await
        .map_err(|e| Error::Internal(format!("encoder task failed: {}", e)))??;
    Ok(bytes)
}
