//! Frame row operations
//!
//! All functions take a `&mut SqliteConnection` so they can run inside a
//! caller-owned transaction. Quiz-level frame order is the dense
//! `frame_by_quiz.priority` sequence; options children are ordered by their
//! own `option_item.priority`.

use crate::models::{
    Frame, FrameKey, FrameTag, ImageFrame, KeyedFrame, LeafFrame, OptionsFrame, TextFrame,
};
use quizshelf_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

fn table(tag: FrameTag) -> &'static str {
    match tag {
        FrameTag::Text => "text_frame",
        FrameTag::Image => "image_frame",
        FrameTag::Options => "options_frame",
    }
}

fn column(tag: FrameTag) -> &'static str {
    match tag {
        FrameTag::Text => "text_frame_id",
        FrameTag::Image => "image_frame_id",
        FrameTag::Options => "options_frame_id",
    }
}

pub async fn insert_text_frame(conn: &mut SqliteConnection, content: &str) -> Result<i64> {
    let id = sqlx::query("INSERT INTO text_frame (content) VALUES (?)")
        .bind(content)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    Ok(id)
}

pub async fn insert_image_frame(
    conn: &mut SqliteConnection,
    filename: &str,
    width: u32,
    height: u32,
    alt_text: Option<&str>,
) -> Result<i64> {
    let id = sqlx::query(
        "INSERT INTO image_frame (filename, width, height, alt_text) VALUES (?, ?, ?, ?)",
    )
    .bind(filename)
    .bind(width)
    .bind(height)
    .bind(alt_text)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn insert_options_frame(conn: &mut SqliteConnection, name: Option<&str>) -> Result<i64> {
    let id = sqlx::query("INSERT INTO options_frame (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    Ok(id)
}

/// Number of frames attached to a quiz
pub async fn quiz_frame_count(conn: &mut SqliteConnection, quiz_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM frame_by_quiz WHERE quiz_id = ?")
        .bind(quiz_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Shift every frame at or after `index` one slot down
pub async fn open_quiz_slot(conn: &mut SqliteConnection, quiz_id: i64, index: i64) -> Result<()> {
    sqlx::query("UPDATE frame_by_quiz SET priority = priority + 1 WHERE quiz_id = ? AND priority >= ?")
        .bind(quiz_id)
        .bind(index)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Close the gap left by a removed frame at `priority`
pub async fn close_quiz_slot(conn: &mut SqliteConnection, quiz_id: i64, priority: i64) -> Result<()> {
    sqlx::query("UPDATE frame_by_quiz SET priority = priority - 1 WHERE quiz_id = ? AND priority > ?")
        .bind(quiz_id)
        .bind(priority)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn associate_with_quiz(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    frame: FrameKey,
    priority: i64,
) -> Result<()> {
    let sql = format!(
        "INSERT INTO frame_by_quiz (quiz_id, {}, priority) VALUES (?, ?, ?)",
        column(frame.tag)
    );
    sqlx::query(&sql)
        .bind(quiz_id)
        .bind(frame.id)
        .bind(priority)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Position of a frame within its quiz, if it is attached to one
pub async fn quiz_frame_priority(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    frame: FrameKey,
) -> Result<Option<i64>> {
    let sql = format!(
        "SELECT priority FROM frame_by_quiz WHERE quiz_id = ? AND {} = ?",
        column(frame.tag)
    );
    let priority: Option<i64> = sqlx::query_scalar(&sql)
        .bind(quiz_id)
        .bind(frame.id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(priority)
}

pub async fn associate_with_options(
    conn: &mut SqliteConnection,
    options_id: i64,
    child: FrameKey,
    is_key: bool,
    priority: i64,
) -> Result<()> {
    if child.tag == FrameTag::Options {
        return Err(Error::InvalidInput(format!(
            "options frame #{} cannot contain {}",
            options_id, child
        )));
    }
    let sql = format!(
        "INSERT INTO option_item (options_frame_id, {}, is_key, priority) VALUES (?, ?, ?, ?)",
        column(child.tag)
    );
    sqlx::query(&sql)
        .bind(options_id)
        .bind(child.id)
        .bind(is_key)
        .bind(priority)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_text_content(conn: &mut SqliteConnection, id: i64, content: &str) -> Result<()> {
    sqlx::query("UPDATE text_frame SET content = ? WHERE id = ?")
        .bind(content)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_image_alt_text(
    conn: &mut SqliteConnection,
    id: i64,
    alt_text: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE image_frame SET alt_text = ? WHERE id = ?")
        .bind(alt_text)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_image_content(
    conn: &mut SqliteConnection,
    id: i64,
    filename: &str,
    width: u32,
    height: u32,
) -> Result<()> {
    sqlx::query("UPDATE image_frame SET filename = ?, width = ?, height = ? WHERE id = ?")
        .bind(filename)
        .bind(width)
        .bind(height)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_options_name(
    conn: &mut SqliteConnection,
    id: i64,
    name: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE options_frame SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_option_is_key(
    conn: &mut SqliteConnection,
    options_id: i64,
    child: FrameKey,
    is_key: bool,
) -> Result<()> {
    let sql = format!(
        "UPDATE option_item SET is_key = ? WHERE options_frame_id = ? AND {} = ?",
        column(child.tag)
    );
    sqlx::query(&sql)
        .bind(is_key)
        .bind(options_id)
        .bind(child.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_option_priority(
    conn: &mut SqliteConnection,
    options_id: i64,
    child: FrameKey,
    priority: i64,
) -> Result<()> {
    let sql = format!(
        "UPDATE option_item SET priority = ? WHERE options_frame_id = ? AND {} = ?",
        column(child.tag)
    );
    sqlx::query(&sql)
        .bind(priority)
        .bind(options_id)
        .bind(child.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete one frame row; association rows go with it by cascade
///
/// Returns false if no such row existed.
pub async fn remove_frame_row(conn: &mut SqliteConnection, frame: FrameKey) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?", table(frame.tag));
    let result = sqlx::query(&sql)
        .bind(frame.id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Child rows of an options frame as currently stored
pub async fn options_children(
    conn: &mut SqliteConnection,
    options_id: i64,
) -> Result<Vec<KeyedFrame>> {
    let rows = sqlx::query(
        r#"
        SELECT oi.id AS link_id, oi.text_frame_id, oi.image_frame_id, oi.is_key, oi.priority,
               t.content, i.filename, i.width, i.height, i.alt_text
        FROM option_item oi
        LEFT JOIN text_frame t ON t.id = oi.text_frame_id
        LEFT JOIN image_frame i ON i.id = oi.image_frame_id
        WHERE oi.options_frame_id = ?
        ORDER BY oi.priority, oi.id
        "#,
    )
    .bind(options_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut children = Vec::with_capacity(rows.len());
    for row in rows {
        let frame = leaf_from_row(&row)?.ok_or_else(|| {
            Error::Internal(format!(
                "option_item {} references no frame",
                row.try_get::<i64, _>("link_id").unwrap_or_default()
            ))
        })?;
        children.push(KeyedFrame {
            frame,
            is_key: row.try_get("is_key")?,
            priority: row.try_get("priority")?,
        });
    }
    Ok(children)
}

/// Frame tree of a quiz in display order
pub async fn frames_of_quiz(conn: &mut SqliteConnection, quiz_id: i64) -> Result<Vec<Frame>> {
    let rows = sqlx::query(
        r#"
        SELECT f.id AS link_id, f.text_frame_id, f.image_frame_id, f.options_frame_id,
               t.content, i.filename, i.width, i.height, i.alt_text, o.name AS options_name
        FROM frame_by_quiz f
        LEFT JOIN text_frame t ON t.id = f.text_frame_id
        LEFT JOIN image_frame i ON i.id = f.image_frame_id
        LEFT JOIN options_frame o ON o.id = f.options_frame_id
        WHERE f.quiz_id = ?
        ORDER BY f.priority, f.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut frames = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(options_id) = row.try_get::<Option<i64>, _>("options_frame_id")? {
            let children = options_children(conn, options_id).await?;
            frames.push(Frame::Options(OptionsFrame {
                id: options_id,
                name: row.try_get("options_name")?,
                frames: children,
            }));
            continue;
        }

        let leaf = leaf_from_row(&row)?.ok_or_else(|| {
            Error::Internal(format!(
                "frame_by_quiz {} references no frame",
                row.try_get::<i64, _>("link_id").unwrap_or_default()
            ))
        })?;
        frames.push(leaf.into());
    }
    Ok(frames)
}

fn leaf_from_row(row: &SqliteRow) -> Result<Option<LeafFrame>> {
    if let Some(id) = row.try_get::<Option<i64>, _>("text_frame_id")? {
        return Ok(Some(LeafFrame::Text(TextFrame {
            id,
            content: row.try_get::<Option<String>, _>("content")?.unwrap_or_default(),
        })));
    }
    if let Some(id) = row.try_get::<Option<i64>, _>("image_frame_id")? {
        return Ok(Some(LeafFrame::Image(ImageFrame {
            id,
            filename: row.try_get::<Option<String>, _>("filename")?.unwrap_or_default(),
            width: row.try_get::<Option<u32>, _>("width")?.unwrap_or(0),
            height: row.try_get::<Option<u32>, _>("height")?.unwrap_or(0),
            alt_text: row.try_get("alt_text")?,
        })));
    }
    Ok(None)
}
