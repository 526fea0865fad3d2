//! Tests for database initialization, schema shape and cascade behavior

use quizshelf_common::db::init::{init_database, open_in_memory};
use quizshelf_common::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("library.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("library.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO dimension (name) VALUES ('Physics')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dimension")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1, "Existing rows should survive reopening");
    assert_eq!(get_schema_version(&pool2).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_all_tables_created() {
    let pool = open_in_memory().await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in [
        "dimension",
        "frame_by_quiz",
        "image_frame",
        "option_item",
        "options_frame",
        "quiz",
        "quiz_by_dimension",
        "quiz_by_session",
        "schema_version",
        "session",
        "text_frame",
    ] {
        assert!(
            tables.iter().any(|t| t == expected),
            "Missing table '{}', found {:?}",
            expected,
            tables
        );
    }
}

#[tokio::test]
async fn test_foreign_keys_enabled() {
    let pool = open_in_memory().await.unwrap();
    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(enabled, 1);
}

#[tokio::test]
async fn test_quiz_delete_cascades_associations() {
    let pool = open_in_memory().await.unwrap();

    sqlx::query("INSERT INTO quiz (id, name, creation_time) VALUES (1, 'Q', CURRENT_TIMESTAMP)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO text_frame (id, content) VALUES (10, 'hello')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO frame_by_quiz (quiz_id, text_frame_id) VALUES (1, 10)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO dimension (id, name) VALUES (5, 'Math')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO quiz_by_dimension (quiz_id, dimension_id) VALUES (1, 5)")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM quiz WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();

    let links: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM frame_by_quiz) + (SELECT COUNT(*) FROM quiz_by_dimension)",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(links, 0, "Association rows should cascade with the quiz");

    let dimensions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dimension")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(dimensions, 1, "Dimension itself must not be deleted");
}

#[tokio::test]
async fn test_frame_association_requires_exactly_one_target() {
    let pool = open_in_memory().await.unwrap();

    sqlx::query("INSERT INTO quiz (id, creation_time) VALUES (1, CURRENT_TIMESTAMP)")
        .execute(&pool)
        .await
        .unwrap();

    let result = sqlx::query("INSERT INTO frame_by_quiz (quiz_id) VALUES (1)")
        .execute(&pool)
        .await;
    assert!(result.is_err(), "Row with no frame reference should violate CHECK");
}
