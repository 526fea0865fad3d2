//! Database initialization
//!
//! Opens the library database, applies connection pragmas and creates the
//! schema on first run. Table creation is idempotent; changes to existing
//! databases go through [`crate::db::migrations`].

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Foreign keys are a per-connection setting, so they go on the connect
    // options rather than a one-off PRAGMA against the pool.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool
/// is pinned to a single connection.
pub async fn open_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create every table the library uses
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_quiz_table(pool).await?;
    create_frame_tables(pool).await?;
    create_frame_association_tables(pool).await?;
    create_dimension_tables(pool).await?;
    create_session_tables(pool).await?;
    Ok(())
}

/// Schema version tracking table
pub async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_quiz_table(pool: &SqlitePool) -> Result<()> {
    // AUTOINCREMENT keeps row ids from being reused after deletes; edit
    // histories key frames by (tag, id).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quiz (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            creation_time TIMESTAMP NOT NULL,
            modification_time TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_frame_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS text_frame (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS image_frame (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL,
            width INTEGER NOT NULL DEFAULT 0,
            height INTEGER NOT NULL DEFAULT 0,
            alt_text TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS options_frame (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_frame_association_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS frame_by_quiz (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quiz_id INTEGER NOT NULL REFERENCES quiz(id) ON DELETE CASCADE,
            text_frame_id INTEGER REFERENCES text_frame(id) ON DELETE CASCADE,
            image_frame_id INTEGER REFERENCES image_frame(id) ON DELETE CASCADE,
            options_frame_id INTEGER REFERENCES options_frame(id) ON DELETE CASCADE,
            priority INTEGER NOT NULL DEFAULT 0,
            CHECK (
                (text_frame_id IS NOT NULL)
                + (image_frame_id IS NOT NULL)
                + (options_frame_id IS NOT NULL) = 1
            )
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_frame_by_quiz_quiz ON frame_by_quiz(quiz_id)")
        .execute(pool)
        .await?;

    // Options children are leaves only, so there is no options column here.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS option_item (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            options_frame_id INTEGER NOT NULL REFERENCES options_frame(id) ON DELETE CASCADE,
            text_frame_id INTEGER REFERENCES text_frame(id) ON DELETE CASCADE,
            image_frame_id INTEGER REFERENCES image_frame(id) ON DELETE CASCADE,
            is_key INTEGER NOT NULL DEFAULT 0,
            priority INTEGER NOT NULL DEFAULT 0,
            CHECK ((text_frame_id IS NOT NULL) + (image_frame_id IS NOT NULL) = 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_option_item_options ON option_item(options_frame_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_dimension_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dimension (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quiz_by_dimension (
            quiz_id INTEGER NOT NULL REFERENCES quiz(id) ON DELETE CASCADE,
            dimension_id INTEGER NOT NULL REFERENCES dimension(id) ON DELETE CASCADE,
            intensity REAL NOT NULL DEFAULT 1.0,
            PRIMARY KEY (quiz_id, dimension_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_session_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            creation_time TIMESTAMP NOT NULL,
            last_access_time TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quiz_by_session (
            session_id INTEGER NOT NULL REFERENCES session(id) ON DELETE CASCADE,
            quiz_id INTEGER NOT NULL REFERENCES quiz(id) ON DELETE CASCADE,
            PRIMARY KEY (session_id, quiz_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
