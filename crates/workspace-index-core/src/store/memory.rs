//! In-memory store implementation for tests and embedded use.
//!
//! Uses `Vec`s behind `std::sync::RwLock` for thread safety. Keyword search
//! ranks by the number of distinct query terms found in a chunk's content
//! (case-insensitive substring match); there is no stemming.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::calendar::CalendarFilter;
use crate::models::{
    ActivityRecord, CalendarEvent, FileChunkSet, IndexedChunk, IndexedFile, NewActivity,
    ScheduledTask, TaskStatus,
};
use crate::search::SearchFilters;
use crate::tasks::TaskFilter;

use super::{ActivityStore, CalendarStore, IndexStore, SortOrder, TaskStore};

/// Source recorded on activities submitted without one.
pub const DEFAULT_ACTIVITY_SOURCE: &str = "agent";

/// In-memory store for tests.
pub struct InMemoryStore {
    chunks: RwLock<Vec<IndexedChunk>>,
    activities: RwLock<Vec<ActivityRecord>>,
    tasks: RwLock<Vec<ScheduledTask>>,
    events: RwLock<Vec<CalendarEvent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            activities: RwLock::new(Vec::new()),
            tasks: RwLock::new(Vec::new()),
            events: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl IndexStore for InMemoryStore {
    async fn replace_file_chunks(&self, set: &FileChunkSet, indexed_at: i64) -> Result<usize> {
        let mut stored = write(&self.chunks)?;
        stored.retain(|c| c.file_path != set.file_path);
        for c in &set.chunks {
            stored.push(IndexedChunk {
                id: Uuid::new_v4().to_string(),
                file_path: set.file_path.clone(),
                title: c.title.clone(),
                content: c.content.clone(),
                file_type: set.file_type.clone(),
                source_type: set.source_type,
                content_type: set.content_type.clone(),
                line_number: c.line_number,
                line_end: c.line_end,
                context: c.context.clone(),
                last_indexed: indexed_at,
            });
        }
        Ok(set.chunks.len())
    }

    async fn clear_file(&self, file_path: &str) -> Result<usize> {
        let mut stored = write(&self.chunks)?;
        let before = stored.len();
        stored.retain(|c| c.file_path != file_path);
        Ok(before - stored.len())
    }

    async fn file_chunks(&self, file_path: &str) -> Result<Vec<IndexedChunk>> {
        let stored = read(&self.chunks)?;
        let mut chunks: Vec<IndexedChunk> = stored
            .iter()
            .filter(|c| c.file_path == file_path)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.line_number);
        Ok(chunks)
    }

    async fn indexed_files(&self) -> Result<Vec<IndexedFile>> {
        let stored = read(&self.chunks)?;
        let mut files: BTreeMap<&str, IndexedFile> = BTreeMap::new();
        for c in stored.iter() {
            files
                .entry(c.file_path.as_str())
                .and_modify(|f| {
                    f.chunk_count += 1;
                    f.last_indexed = f.last_indexed.min(c.last_indexed);
                })
                .or_insert_with(|| IndexedFile {
                    file_path: c.file_path.clone(),
                    file_type: c.file_type.clone(),
                    source_type: c.source_type,
                    last_indexed: c.last_indexed,
                    chunk_count: 1,
                });
        }
        Ok(files.into_values().collect())
    }

    async fn all_chunks(&self) -> Result<Vec<IndexedChunk>> {
        Ok(read(&self.chunks)?.clone())
    }

    async fn recent_chunks(&self, limit: usize) -> Result<Vec<IndexedChunk>> {
        let mut chunks = read(&self.chunks)?.clone();
        // stable sort keeps insertion (line) order within a file
        chunks.sort_by_key(|c| Reverse(c.last_indexed));
        chunks.truncate(limit);
        Ok(chunks)
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<IndexedChunk>> {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let stored = read(&self.chunks)?;
        let mut scored: Vec<(usize, &IndexedChunk)> = stored
            .iter()
            .filter(|c| filters.matches(c))
            .filter_map(|c| {
                let text_lower = c.content.to_lowercase();
                let hits = terms.iter().filter(|t| text_lower.contains(*t)).count();
                (hits > 0).then_some((hits, c))
            })
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| {
            sb.cmp(sa)
                .then_with(|| b.last_indexed.cmp(&a.last_indexed))
                .then_with(|| a.file_path.cmp(&b.file_path))
                .then_with(|| a.line_number.cmp(&b.line_number))
        });
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(_, c)| c.clone()).collect())
    }
}

#[async_trait]
impl ActivityStore for InMemoryStore {
    async fn append_activity(&self, activity: &NewActivity, now: i64) -> Result<ActivityRecord> {
        let mut stored = write(&self.activities)?;
        let latest = stored.iter().map(|a| a.timestamp).max();
        let timestamp = latest.map_or(now, |last| now.max(last + 1));

        let record = ActivityRecord {
            id: Uuid::new_v4().to_string(),
            timestamp,
            action_type: activity.action_type.clone(),
            description: activity.description.clone(),
            status: activity.status,
            metadata: activity.metadata.clone(),
            source: activity
                .source
                .clone()
                .unwrap_or_else(|| DEFAULT_ACTIVITY_SOURCE.to_string()),
        };
        stored.push(record.clone());
        Ok(record)
    }

    async fn activities_before(
        &self,
        cursor: Option<i64>,
        action_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>> {
        let stored = read(&self.activities)?;
        let mut page: Vec<ActivityRecord> = stored
            .iter()
            .filter(|a| cursor.map_or(true, |c| a.timestamp < c))
            .filter(|a| action_type.map_or(true, |t| a.action_type == t))
            .cloned()
            .collect();
        page.sort_by_key(|a| Reverse(a.timestamp));
        page.truncate(limit);
        Ok(page)
    }

    async fn activities_in_range(
        &self,
        start: i64,
        end: i64,
        order: SortOrder,
    ) -> Result<Vec<ActivityRecord>> {
        let stored = read(&self.activities)?;
        let mut records: Vec<ActivityRecord> = stored
            .iter()
            .filter(|a| a.timestamp >= start && a.timestamp <= end)
            .cloned()
            .collect();
        match order {
            SortOrder::Asc => records.sort_by_key(|a| a.timestamp),
            SortOrder::Desc => records.sort_by_key(|a| Reverse(a.timestamp)),
        }
        Ok(records)
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn insert_task(&self, task: &ScheduledTask) -> Result<()> {
        write(&self.tasks)?.push(task.clone());
        Ok(())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<ScheduledTask>> {
        let stored = read(&self.tasks)?;
        let mut tasks: Vec<ScheduledTask> =
            stored.iter().filter(|t| filter.matches(t)).cloned().collect();
        tasks.sort_by_key(|t| t.next_run_at);
        Ok(tasks)
    }

    async fn set_task_status(&self, id: &str, status: TaskStatus) -> Result<bool> {
        let mut stored = write(&self.tasks)?;
        match stored.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&self, id: &str) -> Result<bool> {
        let mut stored = write(&self.tasks)?;
        let before = stored.len();
        stored.retain(|t| t.id != id);
        Ok(stored.len() < before)
    }
}

#[async_trait]
impl CalendarStore for InMemoryStore {
    async fn insert_event(&self, event: &CalendarEvent) -> Result<()> {
        write(&self.events)?.push(event.clone());
        Ok(())
    }

    async fn list_events(
        &self,
        filter: &CalendarFilter,
        limit: Option<usize>,
    ) -> Result<Vec<CalendarEvent>> {
        let stored = read(&self.events)?;
        let mut events: Vec<CalendarEvent> =
            stored.iter().filter(|e| filter.matches(e)).cloned().collect();
        events.sort_by_key(|e| e.start_time);
        if let Some(limit) = limit {
            events.truncate(limit);
        }
        Ok(events)
    }

    async fn delete_event(&self, id: &str) -> Result<bool> {
        let mut stored = write(&self.events)?;
        let before = stored.len();
        stored.retain(|e| e.id != id);
        Ok(stored.len() < before)
    }
}
