//! Storage abstraction for Workspace Index.
//!
//! Three traits describe the capability surface the services need from a
//! persistent document/search store:
//!
//! | Trait | Collection | Capabilities |
//! |-------|------------|--------------|
//! | [`IndexStore`] | indexed chunks | replace-set by file path, delete by file path, grouped listing, full scan, filtered full-text search |
//! | [`ActivityStore`] | activity log | append with store-assigned timestamp, descending cursor scan, inclusive range scan |
//! | [`TaskStore`] | scheduled tasks | insert, filtered listing, status patch, delete |
//! | [`CalendarStore`] | calendar events | insert, start-time range listing, delete |
//!
//! Implementations must be `Send + Sync` and must apply
//! [`IndexStore::replace_file_chunks`] atomically per file path.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::calendar::CalendarFilter;
use crate::models::{
    ActivityRecord, CalendarEvent, FileChunkSet, IndexedChunk, IndexedFile, NewActivity,
    ScheduledTask, TaskStatus,
};
use crate::search::SearchFilters;
use crate::tasks::TaskFilter;

/// Sort direction for timestamp-ordered scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Replace every chunk stored for `set.file_path` with `set.chunks`,
    /// stamping them with `indexed_at`. Returns the number of chunks written.
    async fn replace_file_chunks(&self, set: &FileChunkSet, indexed_at: i64) -> Result<usize>;

    /// Delete every chunk stored for `file_path`. Returns the number deleted.
    async fn clear_file(&self, file_path: &str) -> Result<usize>;

    /// Chunks of one file, in line order.
    async fn file_chunks(&self, file_path: &str) -> Result<Vec<IndexedChunk>>;

    /// One entry per indexed file path.
    async fn indexed_files(&self) -> Result<Vec<IndexedFile>>;

    /// Every chunk in the index.
    async fn all_chunks(&self) -> Result<Vec<IndexedChunk>>;

    /// The `limit` most recently indexed chunks, newest first.
    async fn recent_chunks(&self, limit: usize) -> Result<Vec<IndexedChunk>>;

    /// Full-text search over chunk content, constrained by `filters`, best
    /// match first.
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<IndexedChunk>>;
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Append an activity. The stored timestamp is
    /// `max(now, latest_timestamp + 1)` so timestamps are strictly increasing.
    async fn append_activity(&self, activity: &NewActivity, now: i64) -> Result<ActivityRecord>;

    /// Up to `limit` records with `timestamp < cursor` (all when `cursor` is
    /// `None`), optionally restricted to one action type, newest first.
    async fn activities_before(
        &self,
        cursor: Option<i64>,
        action_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>>;

    /// All records with `start <= timestamp <= end`.
    async fn activities_in_range(
        &self,
        start: i64,
        end: i64,
        order: SortOrder,
    ) -> Result<Vec<ActivityRecord>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: &ScheduledTask) -> Result<()>;

    /// Tasks matching `filter`, ascending by `next_run_at`.
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<ScheduledTask>>;

    /// Returns `false` when no task has this id.
    async fn set_task_status(&self, id: &str, status: TaskStatus) -> Result<bool>;

    /// Returns `false` when no task has this id.
    async fn delete_task(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn insert_event(&self, event: &CalendarEvent) -> Result<()>;

    /// Events matching `filter`, ascending by `start_time`, at most `limit`
    /// when given.
    async fn list_events(
        &self,
        filter: &CalendarFilter,
        limit: Option<usize>,
    ) -> Result<Vec<CalendarEvent>>;

    async fn delete_event(&self, id: &str) -> Result<bool>;
}
