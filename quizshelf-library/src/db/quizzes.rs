//! Quiz row operations

use super::{dimensions, frames};
use crate::models::Quiz;
use chrono::{DateTime, Utc};
use quizshelf_common::Result;
use serde::Serialize;
use sqlx::{Row, SqliteConnection};

/// Quiz listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSummary {
    pub id: i64,
    pub name: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub modification_time: Option<DateTime<Utc>>,
    pub frame_count: i64,
}

pub async fn insert_quiz(
    conn: &mut SqliteConnection,
    name: Option<&str>,
    creation_time: DateTime<Utc>,
    modification_time: Option<DateTime<Utc>>,
) -> Result<i64> {
    let id = sqlx::query("INSERT INTO quiz (name, creation_time, modification_time) VALUES (?, ?, ?)")
        .bind(name)
        .bind(creation_time)
        .bind(modification_time)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    Ok(id)
}

/// Fetch a quiz with its frame tree and dimension tags
pub async fn get_quiz(conn: &mut SqliteConnection, quiz_id: i64) -> Result<Option<Quiz>> {
    let row = sqlx::query("SELECT id, name, creation_time, modification_time FROM quiz WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let frames = frames::frames_of_quiz(conn, quiz_id).await?;
    let dimensions = dimensions::dimensions_of_quiz(conn, quiz_id).await?;

    Ok(Some(Quiz {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        frames,
        dimensions,
        creation_time: row.try_get("creation_time")?,
        modification_time: row.try_get("modification_time")?,
    }))
}

pub async fn quiz_exists(conn: &mut SqliteConnection, quiz_id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM quiz WHERE id = ?)")
        .bind(quiz_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

/// All quizzes, ascending id
pub async fn list_quizzes(conn: &mut SqliteConnection) -> Result<Vec<QuizSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT q.id, q.name, q.creation_time, q.modification_time, COUNT(f.id) AS frame_count
        FROM quiz q
        LEFT JOIN frame_by_quiz f ON f.quiz_id = q.id
        GROUP BY q.id
        ORDER BY q.id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(QuizSummary {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                creation_time: row.try_get("creation_time")?,
                modification_time: row.try_get("modification_time")?,
                frame_count: row.try_get("frame_count")?,
            })
        })
        .collect()
}

pub async fn rename_quiz(conn: &mut SqliteConnection, quiz_id: i64, name: Option<&str>) -> Result<bool> {
    let result = sqlx::query("UPDATE quiz SET name = ? WHERE id = ?")
        .bind(name)
        .bind(quiz_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_modification_time(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    time: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query("UPDATE quiz SET modification_time = ? WHERE id = ?")
        .bind(time)
        .bind(quiz_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a quiz with every frame row it owns
///
/// Frame rows do not cascade from the quiz (the association points the
/// other way), so leaves inside options groups go first, then the quiz's own
/// frames, then the quiz row.
pub async fn remove_quiz(conn: &mut SqliteConnection, quiz_id: i64) -> Result<bool> {
    for leaf in ["text_frame", "image_frame"] {
        let sql = format!(
            r#"
            DELETE FROM {leaf} WHERE id IN (
                SELECT oi.{leaf}_id FROM option_item oi
                JOIN frame_by_quiz f ON f.options_frame_id = oi.options_frame_id
                WHERE f.quiz_id = ?
            )
            "#
        );
        sqlx::query(&sql).bind(quiz_id).execute(&mut *conn).await?;
    }

    for table in ["text_frame", "image_frame", "options_frame"] {
        let sql = format!(
            "DELETE FROM {table} WHERE id IN (SELECT {table}_id FROM frame_by_quiz WHERE quiz_id = ?)"
        );
        sqlx::query(&sql).bind(quiz_id).execute(&mut *conn).await?;
    }

    let result = sqlx::query("DELETE FROM quiz WHERE id = ?")
        .bind(quiz_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrameKey, FrameTag};
    use quizshelf_common::db::open_in_memory;

    #[tokio::test]
    async fn test_remove_quiz_leaves_no_frame_rows() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let quiz_id = insert_quiz(&mut conn, Some("Optics"), Utc::now(), None).await.unwrap();

        let text = frames::insert_text_frame(&mut conn, "question").await.unwrap();
        frames::associate_with_quiz(&mut conn, quiz_id, FrameKey { tag: FrameTag::Text, id: text }, 0)
            .await
            .unwrap();
        let options = frames::insert_options_frame(&mut conn, None).await.unwrap();
        frames::associate_with_quiz(
            &mut conn,
            quiz_id,
            FrameKey {
                tag: FrameTag::Options,
                id: options,
            },
            1,
        )
        .await
        .unwrap();
        let child = frames::insert_image_frame(&mut conn, "a.png", 4, 4, None).await.unwrap();
        frames::associate_with_options(
            &mut conn,
            options,
            FrameKey {
                tag: FrameTag::Image,
                id: child,
            },
            true,
            0,
        )
        .await
        .unwrap();

        assert!(remove_quiz(&mut conn, quiz_id).await.unwrap());

        let leftover: i64 = sqlx::query_scalar(
            r#"
            SELECT (SELECT COUNT(*) FROM text_frame) + (SELECT COUNT(*) FROM image_frame)
                 + (SELECT COUNT(*) FROM options_frame) + (SELECT COUNT(*) FROM option_item)
                 + (SELECT COUNT(*) FROM frame_by_quiz)
            "#,
        )
        .fetch_one(&mut *conn)
        .await
        .unwrap();
        assert_eq!(leftover, 0);
        assert!(!quiz_exists(&mut conn, quiz_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_counts_frames() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let empty = insert_quiz(&mut conn, None, Utc::now(), None).await.unwrap();
        let full = insert_quiz(&mut conn, Some("Full"), Utc::now(), None).await.unwrap();
        let text = frames::insert_text_frame(&mut conn, "x").await.unwrap();
        frames::associate_with_quiz(&mut conn, full, FrameKey { tag: FrameTag::Text, id: text }, 0)
            .await
            .unwrap();

        let list = list_quizzes(&mut conn).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, empty);
        assert_eq!(list[0].frame_count, 0);
        assert_eq!(list[1].frame_count, 1);
    }

    #[tokio::test]
    async fn test_rename_and_stamp() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let id = insert_quiz(&mut conn, Some("Old"), Utc::now(), None).await.unwrap();
        let stamp = Utc::now();

        assert!(rename_quiz(&mut conn, id, Some("New")).await.unwrap());
        assert!(update_modification_time(&mut conn, id, stamp).await.unwrap());

        let quiz = get_quiz(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(quiz.name.as_deref(), Some("New"));
        assert!(quiz.modification_time.is_some());
        assert!(get_quiz(&mut conn, id + 100).await.unwrap().is_none());
    }
}
