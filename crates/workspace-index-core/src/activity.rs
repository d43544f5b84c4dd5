//! Append-only activity feed.
//!
//! Producers log what the agent did; the dashboard reads the feed back as a
//! cursor-paginated list, as a time range, and as rolling window counters.
//!
//! # Pagination
//!
//! Pages are newest-first. A request with `cursor = c` returns records with
//! `timestamp < c`; a full page reports `next_cursor` = the timestamp of its
//! oldest record. Because the store assigns strictly increasing timestamps,
//! walking cursors enumerates every record exactly once.

use anyhow::Result;
use serde::Serialize;

use crate::error::CoreError;
use crate::models::{ActivityRecord, ActivityStatus, NewActivity};
use crate::store::{ActivityStore, SortOrder};

/// One hour in milliseconds.
pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// Feed tuning, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub window_hours: i64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 500,
            window_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
    pub cursor: Option<i64>,
    pub action_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPage {
    pub items: Vec<ActivityRecord>,
    /// Pass back as `cursor` to fetch the next page; `None` on the last page.
    pub next_cursor: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub pending: usize,
    /// Most recent record in the window.
    pub last_activity: Option<ActivityRecord>,
}

/// Service wrapper binding an [`ActivityStore`] to feed settings.
pub struct ActivityFeed<'a, S: ActivityStore + ?Sized> {
    store: &'a S,
    settings: FeedSettings,
}

impl<'a, S: ActivityStore + ?Sized> ActivityFeed<'a, S> {
    pub fn new(store: &'a S, settings: FeedSettings) -> Self {
        Self { store, settings }
    }

    /// Validate and append an activity stamped at `now` (Unix ms).
    pub async fn log(&self, activity: NewActivity, now: i64) -> Result<ActivityRecord> {
        validate(&activity)?;
        let record = self.store.append_activity(&activity, now).await?;
        tracing::debug!(
            id = %record.id,
            action_type = %record.action_type,
            status = %record.status,
            "activity logged"
        );
        Ok(record)
    }

    pub async fn list(&self, query: &ActivityQuery) -> Result<ActivityPage> {
        let limit = query
            .limit
            .unwrap_or(self.settings.default_limit)
            .clamp(1, self.settings.max_limit.max(1));
        let action_type = query
            .action_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let items = self
            .store
            .activities_before(query.cursor, action_type, limit)
            .await?;
        let next_cursor = if items.len() == limit {
            items.last().map(|a| a.timestamp)
        } else {
            None
        };
        Ok(ActivityPage { items, next_cursor })
    }

    /// Records with `start <= timestamp <= end`.
    pub async fn list_by_range(
        &self,
        start: i64,
        end: i64,
        order: SortOrder,
    ) -> Result<Vec<ActivityRecord>> {
        if start > end {
            return Err(CoreError::validation(format!(
                "range start {} is after end {}",
                start, end
            ))
            .into());
        }
        self.store.activities_in_range(start, end, order).await
    }

    /// Counters over every record at or after `now - window`.
    ///
    /// There is no upper bound: a burst logged within one millisecond gets
    /// timestamps past the wall clock and must still be counted.
    pub async fn stats(&self, now: i64) -> Result<ActivityStats> {
        let start = now.saturating_sub(self.settings.window_hours.saturating_mul(HOUR_MS));
        let records = self
            .store
            .activities_in_range(start, i64::MAX, SortOrder::Desc)
            .await?;

        let count = |status: ActivityStatus| records.iter().filter(|a| a.status == status).count();
        Ok(ActivityStats {
            total: records.len(),
            success: count(ActivityStatus::Success),
            failed: count(ActivityStatus::Failed),
            pending: count(ActivityStatus::Pending),
            last_activity: records.first().cloned(),
        })
    }
}

fn validate(activity: &NewActivity) -> Result<(), CoreError> {
    if activity.action_type.trim().is_empty() {
        return Err(CoreError::validation("actionType is required"));
    }
    if activity.description.trim().is_empty() {
        return Err(CoreError::validation("description is required"));
    }
    Ok(())
}
