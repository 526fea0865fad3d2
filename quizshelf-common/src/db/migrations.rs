//! Database schema migrations
//!
//! Versioned, idempotent migrations for databases created by older builds.
//! Fresh databases are created with the current schema by
//! [`crate::db::init`] and only get their version recorded here.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - users may upgrade from any older version
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Use ALTER TABLE** - prefer it over DROP/CREATE to preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

/// Set schema version in database
async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

/// Returns true when `table` exists and lacks `column`
async fn missing_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(false);
    }

    let has_column: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;

    Ok(has_column == 0)
}

/// Migration v1: Add alt_text column to image_frame
///
/// Image frames were first stored without alternative text; alt text is
/// edited separately from the image content and needs its own column.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    if !missing_column(pool, "image_frame", "alt_text").await? {
        info!("  image_frame.alt_text present - skipping");
        return Ok(());
    }

    sqlx::query("ALTER TABLE image_frame ADD COLUMN alt_text TEXT")
        .execute(pool)
        .await?;

    info!("  Added alt_text column to image_frame");
    Ok(())
}

/// Migration v2: Add intensity column to quiz_by_dimension
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    if !missing_column(pool, "quiz_by_dimension", "intensity").await? {
        info!("  quiz_by_dimension.intensity present - skipping");
        return Ok(());
    }

    sqlx::query("ALTER TABLE quiz_by_dimension ADD COLUMN intensity REAL NOT NULL DEFAULT 1.0")
        .execute(pool)
        .await?;

    info!("  Added intensity column to quiz_by_dimension");
    Ok(())
}
