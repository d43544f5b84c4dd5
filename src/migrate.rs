//! Idempotent schema migrations.
//!
//! | Table | Purpose |
//! |-------|---------|
//! | `index_chunks` | one row per indexed chunk, keyed by `id`, grouped by `file_path` |
//! | `index_chunks_fts` | FTS5 mirror of chunk content for keyword search |
//! | `activities` | append-only activity log |
//! | `scheduled_tasks` | scheduled task records |
//! | `calendar_events` | dated calendar entries |

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index that does not exist yet.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_chunks (
            id TEXT PRIMARY KEY,
            file_path TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            file_type TEXT NOT NULL,
            source_type TEXT NOT NULL,
            content_type TEXT NOT NULL DEFAULT 'text/plain',
            line_number INTEGER,
            line_end INTEGER,
            context TEXT,
            last_indexed INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activities (
            id TEXT PRIMARY KEY,
            timestamp INTEGER NOT NULL UNIQUE,
            action_type TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL,
            metadata_json TEXT,
            source TEXT NOT NULL DEFAULT 'agent'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scheduled_tasks (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            schedule_type TEXT NOT NULL,
            schedule_expr TEXT NOT NULL,
            command TEXT NOT NULL,
            next_run_at INTEGER NOT NULL,
            last_run_at INTEGER,
            status TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS calendar_events (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            start_time INTEGER NOT NULL,
            end_time INTEGER,
            event_type TEXT NOT NULL,
            recurrence TEXT,
            source TEXT,
            status TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='index_chunks_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE index_chunks_fts USING fts5(
                chunk_id UNINDEXED,
                file_path UNINDEXED,
                content
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    for ddl in [
        "CREATE INDEX IF NOT EXISTS idx_index_chunks_file_path ON index_chunks(file_path)",
        "CREATE INDEX IF NOT EXISTS idx_index_chunks_file_type ON index_chunks(file_type)",
        "CREATE INDEX IF NOT EXISTS idx_index_chunks_source_type ON index_chunks(source_type)",
        "CREATE INDEX IF NOT EXISTS idx_index_chunks_last_indexed ON index_chunks(last_indexed DESC)",
        "CREATE INDEX IF NOT EXISTS idx_activities_action_type ON activities(action_type, timestamp DESC)",
        "CREATE INDEX IF NOT EXISTS idx_scheduled_tasks_next_run ON scheduled_tasks(next_run_at)",
        "CREATE INDEX IF NOT EXISTS idx_calendar_events_start ON calendar_events(start_time)",
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::debug!("schema migrations applied");
    Ok(())
}
