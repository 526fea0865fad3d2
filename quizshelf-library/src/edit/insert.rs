//! Materializing archive content into store rows

use crate::db::{dimensions, frames, quizzes};
use crate::models::{
    Frame, FrameArchive, ImageFrame, KeyedFrame, LeafArchive, LeafFrame, OptionsFrame, Quiz,
    QuizArchive, TextFrame,
};
use quizshelf_common::Result;
use sqlx::SqliteConnection;

/// Insert a leaf frame row
pub async fn create_leaf(conn: &mut SqliteConnection, archive: &LeafArchive) -> Result<LeafFrame> {
    match archive {
        LeafArchive::Text { content } => {
            let id = frames::insert_text_frame(conn, content).await?;
            Ok(LeafFrame::Text(TextFrame {
                id,
                content: content.clone(),
            }))
        }
        LeafArchive::Image {
            filename,
            width,
            height,
            alt_text,
        } => {
            let id = frames::insert_image_frame(conn, filename, *width, *height, alt_text.as_deref())
                .await?;
            Ok(LeafFrame::Image(ImageFrame {
                id,
                filename: filename.clone(),
                width: *width,
                height: *height,
                alt_text: alt_text.clone(),
            }))
        }
    }
}

/// Insert a frame's rows (and an options frame's children) without
/// attaching it to a quiz
pub async fn create_frame(conn: &mut SqliteConnection, archive: &FrameArchive) -> Result<Frame> {
    match archive {
        FrameArchive::Options { name, frames: children } => {
            let id = frames::insert_options_frame(conn, name.as_deref()).await?;
            let mut keyed = Vec::with_capacity(children.len());
            for child in children {
                let leaf = create_leaf(conn, &child.content).await?;
                frames::associate_with_options(conn, id, leaf.key(), child.is_key, child.priority)
                    .await?;
                keyed.push(KeyedFrame {
                    frame: leaf,
                    is_key: child.is_key,
                    priority: child.priority,
                });
            }
            Ok(Frame::Options(OptionsFrame {
                id,
                name: name.clone(),
                frames: keyed,
            }))
        }
        FrameArchive::Text { content } => Ok(create_leaf(
            conn,
            &LeafArchive::Text {
                content: content.clone(),
            },
        )
        .await?
        .into()),
        FrameArchive::Image {
            filename,
            width,
            height,
            alt_text,
        } => Ok(create_leaf(
            conn,
            &LeafArchive::Image {
                filename: filename.clone(),
                width: *width,
                height: *height,
                alt_text: alt_text.clone(),
            },
        )
        .await?
        .into()),
    }
}

/// Insert a frame into a quiz at `index`, shifting later frames down
///
/// An index past the end appends, so priorities stay dense.
pub async fn insert_frame(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    archive: &FrameArchive,
    index: usize,
) -> Result<Frame> {
    let frame = create_frame(conn, archive).await?;
    let count = frames::quiz_frame_count(conn, quiz_id).await?;
    let index = i64::try_from(index).unwrap_or(i64::MAX).min(count);
    frames::open_quiz_slot(conn, quiz_id, index).await?;
    frames::associate_with_quiz(conn, quiz_id, frame.key(), index).await?;
    Ok(frame)
}

/// Insert a whole quiz: quiz row, frame rows, dimension tags
///
/// Creation and modification stamps are taken from the archive. Returns the
/// stored quiz with its freshly assigned row ids.
pub async fn insert_quiz(conn: &mut SqliteConnection, archive: &QuizArchive) -> Result<Quiz> {
    let quiz_id = quizzes::insert_quiz(
        conn,
        archive.name.as_deref(),
        archive.creation_time,
        archive.modification_time,
    )
    .await?;

    let mut stored = Vec::with_capacity(archive.frames.len());
    for (priority, frame_archive) in archive.frames.iter().enumerate() {
        let frame = create_frame(conn, frame_archive).await?;
        frames::associate_with_quiz(conn, quiz_id, frame.key(), priority as i64).await?;
        stored.push(frame);
    }

    for dimension in &archive.dimensions {
        let dimension_id = dimensions::get_or_create_dimension(conn, &dimension.name).await?;
        dimensions::associate_quiz(conn, quiz_id, dimension_id, dimension.intensity).await?;
    }

    Ok(Quiz {
        id: quiz_id,
        name: archive.name.clone(),
        frames: stored,
        dimensions: archive.dimensions.clone(),
        creation_time: archive.creation_time,
        modification_time: archive.modification_time,
    })
}
