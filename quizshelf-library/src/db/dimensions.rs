//! Dimension (quiz category) operations

use crate::models::DimensionArchive;
use quizshelf_common::Result;
use serde::Serialize;
use sqlx::{Row, SqliteConnection};

/// Dimension with the number of quizzes tagged with it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSummary {
    pub id: i64,
    pub name: String,
    pub quiz_count: i64,
}

/// Id of the dimension called `name`, creating it if needed
pub async fn get_or_create_dimension(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    sqlx::query("INSERT INTO dimension (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    let id: i64 = sqlx::query_scalar("SELECT id FROM dimension WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

/// Tag a quiz; re-tagging updates the intensity
pub async fn associate_quiz(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    dimension_id: i64,
    intensity: f64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO quiz_by_dimension (quiz_id, dimension_id, intensity)
        VALUES (?, ?, ?)
        ON CONFLICT(quiz_id, dimension_id) DO UPDATE SET intensity = excluded.intensity
        "#,
    )
    .bind(quiz_id)
    .bind(dimension_id)
    .bind(intensity)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn dimensions_of_quiz(
    conn: &mut SqliteConnection,
    quiz_id: i64,
) -> Result<Vec<DimensionArchive>> {
    let rows = sqlx::query(
        r#"
        SELECT d.name, qd.intensity
        FROM quiz_by_dimension qd
        JOIN dimension d ON d.id = qd.dimension_id
        WHERE qd.quiz_id = ?
        ORDER BY d.name
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(DimensionArchive {
                name: row.try_get("name")?,
                intensity: row.try_get("intensity")?,
            })
        })
        .collect()
}

pub async fn list_dimensions(conn: &mut SqliteConnection) -> Result<Vec<DimensionSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT d.id, d.name, COUNT(qd.quiz_id) AS quiz_count
        FROM dimension d
        LEFT JOIN quiz_by_dimension qd ON qd.dimension_id = d.id
        GROUP BY d.id, d.name
        ORDER BY d.name
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(DimensionSummary {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                quiz_count: row.try_get("quiz_count")?,
            })
        })
        .collect()
}

/// Ids of quizzes tagged with a dimension, ascending
pub async fn quizzes_in_dimension(
    conn: &mut SqliteConnection,
    dimension_id: i64,
) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT quiz_id FROM quiz_by_dimension WHERE dimension_id = ? ORDER BY quiz_id",
    )
    .bind(dimension_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

/// Delete a dimension; member quizzes only lose the tag
pub async fn remove_dimension(conn: &mut SqliteConnection, dimension_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM dimension WHERE id = ?")
        .bind(dimension_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
