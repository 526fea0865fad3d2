//! Applying edits to the store
//!
//! A whole edit list runs inside one transaction; the first failing
//! statement aborts it and nothing of the list is kept.

use super::diff::{diff_options, OptionsChange};
use super::insert;
use crate::db::{frames, quizzes};
use crate::models::{Edit, Frame, ImageFrame, LeafFrame, OptionsFrame};
use chrono::{DateTime, Utc};
use quizshelf_common::{Clock, Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

/// Apply `edits` to a quiz in one transaction
pub async fn apply(pool: &SqlitePool, quiz_id: i64, edits: &[Edit], clock: &dyn Clock) -> Result<()> {
    let mut tx = pool.begin().await?;
    apply_edits(&mut *tx, quiz_id, edits, clock.now()).await?;
    tx.commit().await?;

    info!(quiz_id, edits = edits.len(), "Applied edits");
    Ok(())
}

/// Stamp the quiz's modification time, then run each edit in order
pub async fn apply_edits(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    edits: &[Edit],
    now: DateTime<Utc>,
) -> Result<()> {
    if !quizzes::update_modification_time(conn, quiz_id, now).await? {
        return Err(Error::NotFound(format!("quiz {}", quiz_id)));
    }

    for edit in edits {
        match edit {
            Edit::Append {
                frame,
                insert_index,
            } => {
                let stored =
                    insert::insert_frame(conn, quiz_id, &frame.to_archive(), *insert_index).await?;
                debug!(quiz_id, frame = %stored.key(), index = insert_index, "Appended frame");
            }
            Edit::Remove { frame, .. } => remove_frame(conn, quiz_id, frame).await?,
            Edit::Update { old, new } => update_frame(conn, old, new).await?,
            Edit::Rename { new, .. } => {
                quizzes::rename_quiz(conn, quiz_id, new.as_deref()).await?;
            }
        }
    }
    Ok(())
}

/// Delete a frame from a quiz; an options frame's children go first
pub async fn remove_frame(conn: &mut SqliteConnection, quiz_id: i64, frame: &Frame) -> Result<()> {
    let key = frame.key();
    let slot = frames::quiz_frame_priority(conn, quiz_id, key).await?;

    if let Frame::Options(options) = frame {
        for child in frames::options_children(conn, options.id).await? {
            frames::remove_frame_row(conn, child.frame.key()).await?;
        }
    }
    frames::remove_frame_row(conn, key).await?;

    if let Some(priority) = slot {
        frames::close_quiz_slot(conn, quiz_id, priority).await?;
    }
    debug!(quiz_id, frame = %key, "Removed frame");
    Ok(())
}

/// Update a frame in place; `old` and `new` must share tag and id
pub async fn update_frame(conn: &mut SqliteConnection, old: &Frame, new: &Frame) -> Result<()> {
    if old.key() != new.key() {
        return Err(Error::InvalidInput(format!(
            "update must keep frame identity: {} -> {}",
            old.key(),
            new.key()
        )));
    }

    match (old, new) {
        (Frame::Text(_), Frame::Text(text)) => {
            frames::update_text_content(conn, text.id, &text.content).await
        }
        (Frame::Image(old), Frame::Image(new)) => update_image(conn, old, new).await,
        (Frame::Options(old), Frame::Options(new)) => update_options(conn, old, new).await,
        _ => Err(Error::Internal(format!("frame kinds diverged for {}", new.key()))),
    }
}

async fn update_leaf(conn: &mut SqliteConnection, old: &LeafFrame, new: &LeafFrame) -> Result<()> {
    match (old, new) {
        (LeafFrame::Text(_), LeafFrame::Text(text)) => {
            frames::update_text_content(conn, text.id, &text.content).await
        }
        (LeafFrame::Image(old), LeafFrame::Image(new)) => update_image(conn, old, new).await,
        _ => Err(Error::InvalidInput(format!(
            "update must keep frame identity: {} -> {}",
            old.key(),
            new.key()
        ))),
    }
}

/// Alt text and image content are edited separately, so each has its own
/// statement and only what changed is written.
async fn update_image(conn: &mut SqliteConnection, old: &ImageFrame, new: &ImageFrame) -> Result<()> {
    if old.alt_text != new.alt_text {
        frames::update_image_alt_text(conn, new.id, new.alt_text.as_deref()).await?;
    }
    if old.content_differs(new) {
        frames::update_image_content(conn, new.id, &new.filename, new.width, new.height).await?;
    }
    Ok(())
}

async fn update_options(
    conn: &mut SqliteConnection,
    old: &OptionsFrame,
    new: &OptionsFrame,
) -> Result<()> {
    if old.name != new.name {
        frames::update_options_name(conn, new.id, new.name.as_deref()).await?;
    }

    for change in diff_options(&old.frames, &new.frames) {
        match change {
            OptionsChange::Remove(item) => {
                frames::remove_frame_row(conn, item.frame.key()).await?;
            }
            OptionsChange::Insert { index, item } => {
                let leaf = insert::create_leaf(conn, &item.frame.to_archive()).await?;
                frames::associate_with_options(conn, new.id, leaf.key(), item.is_key, item.priority)
                    .await?;
                debug!(options_id = new.id, child = %leaf.key(), index, "Inserted option");
            }
            OptionsChange::Update { old, new } => update_leaf(conn, &old, &new).await?,
            OptionsChange::SetKey { frame, is_key } => {
                frames::set_option_is_key(conn, new.id, frame, is_key).await?;
            }
            OptionsChange::Reorder { frame, priority } => {
                frames::set_option_priority(conn, new.id, frame, priority).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrameArchive, QuizArchive, TextFrame};
    use quizshelf_common::db::open_in_memory;
    use quizshelf_common::FixedClock;

    async fn seeded_quiz(pool: &SqlitePool) -> crate::models::Quiz {
        let mut conn = pool.acquire().await.unwrap();
        insert::insert_quiz(
            &mut conn,
            &QuizArchive {
                name: Some("Draft".to_string()),
                frames: vec![
                    FrameArchive::Text {
                        content: "first".to_string(),
                    },
                    FrameArchive::Image {
                        filename: "a.png".to_string(),
                        width: 1,
                        height: 1,
                        alt_text: None,
                    },
                ],
                dimensions: Vec::new(),
                creation_time: Utc::now(),
                modification_time: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_apply_stamps_and_renames() {
        let pool = open_in_memory().await.unwrap();
        let quiz = seeded_quiz(&pool).await;
        let clock = FixedClock(Utc::now());

        apply(
            &pool,
            quiz.id,
            &[Edit::Rename {
                old: Some("Draft".to_string()),
                new: Some("Final".to_string()),
            }],
            &clock,
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let stored = quizzes::get_quiz(&mut conn, quiz.id).await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Final"));
        assert!(stored.modification_time.is_some());
    }

    #[tokio::test]
    async fn test_image_alt_and_content_update_together() {
        let pool = open_in_memory().await.unwrap();
        let quiz = seeded_quiz(&pool).await;
        let old = quiz.frames[1].clone();
        let Frame::Image(mut image) = old.clone() else {
            panic!("expected image frame");
        };
        image.alt_text = Some("diagram".to_string());
        image.filename = "b.png".to_string();

        apply(
            &pool,
            quiz.id,
            &[Edit::Update {
                old,
                new: Frame::Image(image.clone()),
            }],
            &FixedClock(Utc::now()),
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let stored = quizzes::get_quiz(&mut conn, quiz.id).await.unwrap().unwrap();
        assert_eq!(stored.frames[1], Frame::Image(image));
    }

    #[tokio::test]
    async fn test_failed_edit_rolls_back_whole_list() {
        let pool = open_in_memory().await.unwrap();
        let quiz = seeded_quiz(&pool).await;
        let text = quiz.frames[0].clone();

        let result = apply(
            &pool,
            quiz.id,
            &[
                Edit::Rename {
                    old: Some("Draft".to_string()),
                    new: Some("Renamed".to_string()),
                },
                Edit::Update {
                    old: text.clone(),
                    new: Frame::Text(TextFrame {
                        id: text.id() + 1000,
                        content: "mismatched".to_string(),
                    }),
                },
            ],
            &FixedClock(Utc::now()),
        )
        .await;
        assert!(result.is_err());

        let mut conn = pool.acquire().await.unwrap();
        let stored = quizzes::get_quiz(&mut conn, quiz.id).await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Draft"));
        assert!(stored.modification_time.is_none());
    }

    #[tokio::test]
    async fn test_remove_closes_gap() {
        let pool = open_in_memory().await.unwrap();
        let quiz = seeded_quiz(&pool).await;

        apply(
            &pool,
            quiz.id,
            &[
                Edit::Remove {
                    frame: quiz.frames[0].clone(),
                    old_index: 0,
                },
                Edit::Append {
                    frame: Frame::Text(TextFrame {
                        id: -1,
                        content: "last".to_string(),
                    }),
                    insert_index: 1,
                },
            ],
            &FixedClock(Utc::now()),
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let stored = quizzes::get_quiz(&mut conn, quiz.id).await.unwrap().unwrap();
        assert_eq!(stored.frames.len(), 2);
        assert!(matches!(stored.frames[0], Frame::Image(_)));
        match &stored.frames[1] {
            Frame::Text(t) => assert_eq!(t.content, "last"),
            other => panic!("unexpected frame {:?}", other),
        }
    }
}
