//! SQLite-backed store implementation.
//!
//! Implements the core [`IndexStore`], [`ActivityStore`], [`TaskStore`], and
//! [`CalendarStore`] traits against the schema created by [`crate::migrate`]. Keyword search
//! runs through the `index_chunks_fts` FTS5 table ranked by `bm25`.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use workspace_index_core::calendar::CalendarFilter;
use workspace_index_core::models::{
    ActivityMetadata, ActivityRecord, CalendarEvent, FileChunkSet, IndexedChunk, IndexedFile,
    NewActivity, ScheduledTask, TaskStatus,
};
use workspace_index_core::search::SearchFilters;
use workspace_index_core::store::memory::DEFAULT_ACTIVITY_SOURCE;
use workspace_index_core::store::{
    ActivityStore, CalendarStore, IndexStore, SortOrder, TaskStore,
};
use workspace_index_core::tasks::TaskFilter;

const CHUNK_COLUMNS: &str = "c.id, c.file_path, c.title, c.content, c.file_type, c.source_type, \
     c.content_type, c.line_number, c.line_end, c.context, c.last_indexed";

const ACTIVITY_COLUMNS: &str =
    "id, timestamp, action_type, description, status, metadata_json, source";

const TASK_COLUMNS: &str = "id, name, description, schedule_type, schedule_expr, command, \
     next_run_at, last_run_at, status";

const EVENT_COLUMNS: &str =
    "id, title, description, start_time, end_time, event_type, recurrence, source, status";

/// SQLite implementation of the store traits.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Turn free text into an FTS5 query: each whitespace-separated token is
/// quoted so operator characters are matched literally, and tokens are
/// OR-ed so any term can match. Returns `None` when nothing is left.
pub fn fts_query(raw: &str) -> Option<String> {
    let terms: Vec<String> = raw
        .split_whitespace()
        .map(|t| t.replace('"', ""))
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

fn row_to_chunk(row: &SqliteRow) -> Result<IndexedChunk> {
    let source_type: String = row.get("source_type");
    Ok(IndexedChunk {
        id: row.get("id"),
        file_path: row.get("file_path"),
        title: row.get("title"),
        content: row.get("content"),
        file_type: row.get("file_type"),
        source_type: source_type.parse()?,
        content_type: row.get("content_type"),
        line_number: row.get("line_number"),
        line_end: row.get("line_end"),
        context: row.get("context"),
        last_indexed: row.get("last_indexed"),
    })
}

fn row_to_activity(row: &SqliteRow) -> Result<ActivityRecord> {
    let status: String = row.get("status");
    let metadata_json: Option<String> = row.get("metadata_json");
    let metadata = match metadata_json {
        Some(json) => Some(serde_json::from_str::<ActivityMetadata>(&json)?),
        None => None,
    };
    Ok(ActivityRecord {
        id: row.get("id"),
        timestamp: row.get("timestamp"),
        action_type: row.get("action_type"),
        description: row.get("description"),
        status: status.parse()?,
        metadata,
        source: row.get("source"),
    })
}

fn row_to_task(row: &SqliteRow) -> Result<ScheduledTask> {
    let schedule_type: String = row.get("schedule_type");
    let status: String = row.get("status");
    Ok(ScheduledTask {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        schedule_type: schedule_type.parse()?,
        schedule_expr: row.get("schedule_expr"),
        command: row.get("command"),
        next_run_at: row.get("next_run_at"),
        last_run_at: row.get("last_run_at"),
        status: status.parse()?,
    })
}

fn row_to_event(row: &SqliteRow) -> CalendarEvent {
    CalendarEvent {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        event_type: row.get("event_type"),
        recurrence: row.get("recurrence"),
        source: row.get("source"),
        status: row.get("status"),
    }
}

#[async_trait]
impl IndexStore for SqliteStore {
    async fn replace_file_chunks(&self, set: &FileChunkSet, indexed_at: i64) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM index_chunks_fts WHERE file_path = ?")
            .bind(&set.file_path)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM index_chunks WHERE file_path = ?")
            .bind(&set.file_path)
            .execute(&mut *tx)
            .await?;

        for chunk in &set.chunks {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO index_chunks (id, file_path, title, content, file_type, source_type,
                                          content_type, line_number, line_end, context, last_indexed)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&set.file_path)
            .bind(&chunk.title)
            .bind(&chunk.content)
            .bind(&set.file_type)
            .bind(set.source_type.as_str())
            .bind(&set.content_type)
            .bind(chunk.line_number)
            .bind(chunk.line_end)
            .bind(&chunk.context)
            .bind(indexed_at)
            .execute(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO index_chunks_fts (chunk_id, file_path, content) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(&set.file_path)
                .bind(&chunk.content)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(set.chunks.len())
    }

    async fn clear_file(&self, file_path: &str) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM index_chunks_fts WHERE file_path = ?")
            .bind(file_path)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM index_chunks WHERE file_path = ?")
            .bind(file_path)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted as usize)
    }

    async fn file_chunks(&self, file_path: &str) -> Result<Vec<IndexedChunk>> {
        let sql = format!(
            "SELECT {} FROM index_chunks c WHERE c.file_path = ? ORDER BY c.line_number ASC",
            CHUNK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(file_path)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_chunk).collect()
    }

    async fn indexed_files(&self) -> Result<Vec<IndexedFile>> {
        let rows = sqlx::query(
            r#"
            SELECT file_path, file_type, source_type,
                   MIN(last_indexed) AS last_indexed,
                   COUNT(*) AS chunk_count
            FROM index_chunks
            GROUP BY file_path
            ORDER BY file_path ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<IndexedFile> {
                let source_type: String = row.get("source_type");
                let chunk_count: i64 = row.get("chunk_count");
                Ok(IndexedFile {
                    file_path: row.get("file_path"),
                    file_type: row.get("file_type"),
                    source_type: source_type.parse()?,
                    last_indexed: row.get("last_indexed"),
                    chunk_count: chunk_count as usize,
                })
            })
            .collect()
    }

    async fn all_chunks(&self) -> Result<Vec<IndexedChunk>> {
        let sql = format!(
            "SELECT {} FROM index_chunks c ORDER BY c.file_path ASC, c.line_number ASC",
            CHUNK_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_chunk).collect()
    }

    async fn recent_chunks(&self, limit: usize) -> Result<Vec<IndexedChunk>> {
        let sql = format!(
            "SELECT {} FROM index_chunks c \
             ORDER BY c.last_indexed DESC, c.file_path ASC, c.line_number ASC LIMIT ?",
            CHUNK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_chunk).collect()
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<IndexedChunk>> {
        let Some(match_expr) = fts_query(query) else {
            return Ok(Vec::new());
        };

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM index_chunks_fts \
             JOIN index_chunks c ON c.id = index_chunks_fts.chunk_id \
             WHERE index_chunks_fts MATCH ",
            CHUNK_COLUMNS
        ));
        qb.push_bind(match_expr);

        if let Some(file_type) = &filters.file_type {
            qb.push(" AND c.file_type = ").push_bind(file_type.clone());
        }
        if let Some(source_type) = filters.source_type {
            qb.push(" AND c.source_type = ")
                .push_bind(source_type.as_str());
        }
        if let Some(content_type) = &filters.content_type {
            qb.push(" AND c.content_type = ")
                .push_bind(content_type.clone());
        }

        qb.push(" ORDER BY bm25(index_chunks_fts) ASC, c.last_indexed DESC, c.file_path ASC, c.line_number ASC LIMIT ")
            .push_bind(limit as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_chunk).collect()
    }
}

#[async_trait]
impl ActivityStore for SqliteStore {
    async fn append_activity(&self, activity: &NewActivity, now: i64) -> Result<ActivityRecord> {
        let id = Uuid::new_v4().to_string();
        let metadata_json = activity
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let source = activity
            .source
            .clone()
            .unwrap_or_else(|| DEFAULT_ACTIVITY_SOURCE.to_string());

        // Single statement, so the max-read and the insert cannot interleave
        // with another writer.
        let timestamp: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO activities (id, timestamp, action_type, description, status, metadata_json, source)
            VALUES (?, MAX(?, COALESCE((SELECT MAX(timestamp) FROM activities) + 1, ?)), ?, ?, ?, ?, ?)
            RETURNING timestamp
            "#,
        )
        .bind(&id)
        .bind(now)
        .bind(now)
        .bind(&activity.action_type)
        .bind(&activity.description)
        .bind(activity.status.as_str())
        .bind(&metadata_json)
        .bind(&source)
        .fetch_one(&self.pool)
        .await?;

        Ok(ActivityRecord {
            id,
            timestamp,
            action_type: activity.action_type.clone(),
            description: activity.description.clone(),
            status: activity.status,
            metadata: activity.metadata.clone(),
            source,
        })
    }

    async fn activities_before(
        &self,
        cursor: Option<i64>,
        action_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM activities WHERE 1 = 1",
            ACTIVITY_COLUMNS
        ));
        if let Some(cursor) = cursor {
            qb.push(" AND timestamp < ").push_bind(cursor);
        }
        if let Some(action_type) = action_type {
            qb.push(" AND action_type = ")
                .push_bind(action_type.to_string());
        }
        qb.push(" ORDER BY timestamp DESC LIMIT ")
            .push_bind(limit as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_activity).collect()
    }

    async fn activities_in_range(
        &self,
        start: i64,
        end: i64,
        order: SortOrder,
    ) -> Result<Vec<ActivityRecord>> {
        let direction = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let sql = format!(
            "SELECT {} FROM activities WHERE timestamp >= ? AND timestamp <= ? ORDER BY timestamp {}",
            ACTIVITY_COLUMNS, direction
        );
        let rows = sqlx::query(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_activity).collect()
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn insert_task(&self, task: &ScheduledTask) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_tasks (id, name, description, schedule_type, schedule_expr,
                                         command, next_run_at, last_run_at, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.schedule_type.as_str())
        .bind(&task.schedule_expr)
        .bind(&task.command)
        .bind(task.next_run_at)
        .bind(task.last_run_at)
        .bind(task.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<ScheduledTask>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM scheduled_tasks WHERE 1 = 1",
            TASK_COLUMNS
        ));
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.from {
            qb.push(" AND next_run_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND next_run_at <= ").push_bind(to);
        }
        qb.push(" ORDER BY next_run_at ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn set_task_status(&self, id: &str, status: TaskStatus) -> Result<bool> {
        let updated = sqlx::query("UPDATE scheduled_tasks SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }

    async fn delete_task(&self, id: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM scheduled_tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}

#[async_trait]
impl CalendarStore for SqliteStore {
    async fn insert_event(&self, event: &CalendarEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO calendar_events (id, title, description, start_time, end_time,
                                         event_type, recurrence, source, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.event_type)
        .bind(&event.recurrence)
        .bind(&event.source)
        .bind(&event.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_events(
        &self,
        filter: &CalendarFilter,
        limit: Option<usize>,
    ) -> Result<Vec<CalendarEvent>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM calendar_events WHERE 1 = 1",
            EVENT_COLUMNS
        ));
        if let Some(from) = filter.from {
            qb.push(" AND start_time >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND start_time <= ").push_bind(to);
        }
        qb.push(" ORDER BY start_time ASC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_event).collect())
    }

    async fn delete_event(&self, id: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM calendar_events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}
