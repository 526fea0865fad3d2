//! Shared fixtures for library integration tests
//!
//! Each test gets its own TempDir-backed library; keep the TempDir alive for
//! the duration of the test.

#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use quizshelf_common::config::{LibraryPaths, LibrarySettings};
use quizshelf_library::codec::encode_pack;
use quizshelf_library::models::{
    DimensionArchive, FrameArchive, KeyedArchive, LeafArchive, Pack, QuizArchive, ResourceSource,
};
use quizshelf_library::{ImportState, Library};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

/// Open a fresh library under a temporary root
///
/// Returns (TempDir, LibraryPaths, Library) - TempDir must be kept alive
pub async fn open_library() -> Result<(TempDir, LibraryPaths, Library)> {
    let temp_dir = TempDir::new()?;
    let paths = LibraryPaths::new(temp_dir.path().join("library"));
    let library = Library::open(&paths, &LibrarySettings::default()).await?;
    Ok((temp_dir, paths, library))
}

pub fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 14, 9, 26, 53).unwrap()
}

pub fn text(content: &str) -> FrameArchive {
    FrameArchive::Text {
        content: content.to_string(),
    }
}

pub fn image(filename: &str) -> FrameArchive {
    FrameArchive::Image {
        filename: filename.to_string(),
        width: 64,
        height: 48,
        alt_text: None,
    }
}

pub fn option_text(content: &str, is_key: bool, priority: i64) -> KeyedArchive {
    KeyedArchive {
        content: LeafArchive::Text {
            content: content.to_string(),
        },
        is_key,
        priority,
    }
}

pub fn option_image(filename: &str, is_key: bool, priority: i64) -> KeyedArchive {
    KeyedArchive {
        content: LeafArchive::Image {
            filename: filename.to_string(),
            width: 32,
            height: 32,
            alt_text: Some(format!("picture {}", filename)),
        },
        is_key,
        priority,
    }
}

pub fn options(name: &str, children: Vec<KeyedArchive>) -> FrameArchive {
    FrameArchive::Options {
        name: Some(name.to_string()),
        frames: children,
    }
}

pub fn quiz(name: &str, frames: Vec<FrameArchive>) -> QuizArchive {
    QuizArchive {
        name: Some(name.to_string()),
        frames,
        dimensions: Vec::new(),
        creation_time: created_at(),
        modification_time: None,
    }
}

pub fn tagged(mut quiz: QuizArchive, dimensions: &[&str]) -> QuizArchive {
    quiz.dimensions = dimensions
        .iter()
        .map(|name| DimensionArchive {
            name: name.to_string(),
            intensity: 1.0,
        })
        .collect();
    quiz
}

pub fn pack(quizzes: Vec<QuizArchive>, resources: &[(&str, &str)]) -> Pack {
    Pack {
        quizzes,
        resources: resources
            .iter()
            .map(|(name, bytes)| (name.to_string(), ResourceSource::from_bytes(bytes.as_bytes())))
            .collect(),
    }
}

pub fn pack_bytes(quizzes: Vec<QuizArchive>, resources: &[(&str, &str)]) -> Vec<u8> {
    encode_pack(&pack(quizzes, resources), 6).unwrap()
}

/// The three-quiz pack from the recovery scenarios: Q1 references
/// `img1.png`, which the pack does not carry
pub fn pack_with_missing_resource() -> Vec<u8> {
    pack_bytes(
        vec![
            quiz("Q0", vec![text("zero"), image("q0.png")]),
            quiz("Q1", vec![image("q1-first.png"), image("img1.png")]),
            quiz("Q2", vec![image("q2.png")]),
        ],
        &[
            ("q0.png", "q0-bytes"),
            ("q1-first.png", "q1-bytes"),
            ("q2.png", "q2-bytes"),
        ],
    )
}

/// True for an Error state none of whose gates has fired yet
pub fn is_pending_error(state: &ImportState) -> bool {
    match state {
        ImportState::Error {
            cancel,
            retry,
            skip,
            ignore,
            ..
        } => {
            !cancel.is_spent()
                && [retry, skip, ignore]
                    .into_iter()
                    .flatten()
                    .all(|gate| !gate.is_spent())
        }
        _ => false,
    }
}

/// Wait (bounded) until the published state satisfies `predicate`
pub async fn wait_for_state(
    states: &mut watch::Receiver<ImportState>,
    predicate: impl Fn(&ImportState) -> bool,
) -> ImportState {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let state = states.borrow_and_update().clone();
            if predicate(&state) {
                return state;
            }
            states.changed().await.expect("library service gone");
        }
    })
    .await
    .expect("timed out waiting for import state")
}

/// Wait for an unanswered confirmation state and fire its ok gate
pub async fn confirm(states: &mut watch::Receiver<ImportState>) {
    let unanswered = |s: &ImportState| matches!(s, ImportState::Confirmation { ok, .. } if !ok.is_spent());
    match wait_for_state(states, unanswered).await {
        ImportState::Confirmation { ok, .. } => assert!(ok.fire()),
        other => panic!("expected confirmation, got {}", other.name()),
    }
}

/// Names of the files currently in the resource directory, sorted
pub fn resource_files(paths: &LibraryPaths) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(&paths.resources)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
