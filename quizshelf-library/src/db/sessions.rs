//! Study session operations
//!
//! A session is a named selection of quizzes, built from explicit quiz ids
//! and/or whole dimensions.

use chrono::{DateTime, Utc};
use quizshelf_common::Result;
use serde::Serialize;
use sqlx::{Row, SqliteConnection};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: i64,
    pub name: String,
    pub creation_time: DateTime<Utc>,
    pub last_access_time: Option<DateTime<Utc>>,
    pub quiz_count: i64,
}

/// Create a session from a quiz and dimension selection
pub async fn create_session(
    conn: &mut SqliteConnection,
    name: &str,
    quiz_ids: &[i64],
    dimension_ids: &[i64],
    now: DateTime<Utc>,
) -> Result<i64> {
    let session_id = sqlx::query("INSERT INTO session (name, creation_time) VALUES (?, ?)")
        .bind(name)
        .bind(now)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    for &quiz_id in quiz_ids {
        sqlx::query("INSERT OR IGNORE INTO quiz_by_session (session_id, quiz_id) VALUES (?, ?)")
            .bind(session_id)
            .bind(quiz_id)
            .execute(&mut *conn)
            .await?;
    }

    for &dimension_id in dimension_ids {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO quiz_by_session (session_id, quiz_id)
            SELECT ?, quiz_id FROM quiz_by_dimension WHERE dimension_id = ?
            "#,
        )
        .bind(session_id)
        .bind(dimension_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(session_id)
}

pub async fn list_sessions(conn: &mut SqliteConnection) -> Result<Vec<SessionSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT s.id, s.name, s.creation_time, s.last_access_time, COUNT(qs.quiz_id) AS quiz_count
        FROM session s
        LEFT JOIN quiz_by_session qs ON qs.session_id = s.id
        GROUP BY s.id
        ORDER BY s.id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(SessionSummary {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                creation_time: row.try_get("creation_time")?,
                last_access_time: row.try_get("last_access_time")?,
                quiz_count: row.try_get("quiz_count")?,
            })
        })
        .collect()
}

pub async fn quizzes_in_session(conn: &mut SqliteConnection, session_id: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT quiz_id FROM quiz_by_session WHERE session_id = ? ORDER BY quiz_id")
            .bind(session_id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(ids)
}

pub async fn touch_session(
    conn: &mut SqliteConnection,
    session_id: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query("UPDATE session SET last_access_time = ? WHERE id = ?")
        .bind(now)
        .bind(session_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn remove_session(conn: &mut SqliteConnection, session_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM session WHERE id = ?")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
