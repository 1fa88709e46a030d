//! Database access for the catalog service
//!
//! Two tables: `data_points` (approved catalog entries) and
//! `pending_submissions` (the moderation inbox). Schema is created on
//! startup; list-valued and structured fields are JSON TEXT columns whose
//! shape is checked at this boundary when rows are decoded.

pub mod resources;
pub mod submissions;

use amr_common::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to the catalog database, creating the file and parent directory
/// when missing, and ensures the schema exists.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests.
///
/// A single connection, since every `:memory:` connection is its own
/// database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create catalog tables if they don't exist.
///
/// `data_source_id` and `repository_url` carry UNIQUE constraints; the URL
/// column stores NULL for entries without one, so the constraint only binds
/// real URLs and duplicate detection is not left to a check-then-insert
/// race.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS data_points (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            data_source_id TEXT NOT NULL UNIQUE,
            resource_type TEXT NOT NULL,
            category TEXT,
            subcategory TEXT,
            data_type TEXT,
            level5 TEXT,
            year_start INTEGER,
            year_end INTEGER,
            data_format TEXT NOT NULL DEFAULT 'Unknown',
            data_resolution TEXT NOT NULL DEFAULT 'Unknown',
            repository TEXT NOT NULL DEFAULT 'Unknown',
            repository_url TEXT UNIQUE,
            data_description TEXT,
            keywords TEXT,
            contact_information TEXT,
            last_updated TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            countries TEXT NOT NULL DEFAULT '[]',
            domains TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pending_submissions (
            submission_id INTEGER PRIMARY KEY AUTOINCREMENT,
            status TEXT NOT NULL DEFAULT 'pending',
            resource_name TEXT NOT NULL,
            countries TEXT NOT NULL DEFAULT '[]',
            domains TEXT NOT NULL DEFAULT '[]',
            primary_hierarchy_path TEXT NOT NULL DEFAULT '{}',
            year_start INTEGER,
            year_end INTEGER,
            resource_url TEXT,
            contact_info TEXT,
            description TEXT,
            keywords TEXT,
            license TEXT,
            related_metadata TEXT NOT NULL DEFAULT '[]',
            related_resources TEXT NOT NULL DEFAULT '[]',
            submitted_at TEXT NOT NULL,
            submitter_info TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (data_points, pending_submissions)");

    Ok(())
}
