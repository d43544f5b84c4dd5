//! Core data models used throughout Workspace Index.
//!
//! These types represent the indexed chunks, scan results, activity records,
//! and scheduled tasks that flow between the indexer, the stores, and the
//! HTTP/CLI front ends. All timestamps are Unix milliseconds.
//!
//! JSON field names are camelCase to match the dashboard's query contracts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Semantic category assigned to a workspace file by [`crate::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Memory,
    BusinessLead,
    PaperTrading,
    Task,
    Calendar,
    AgentConfig,
    Workspace,
}

impl SourceType {
    pub const ALL: [SourceType; 7] = [
        SourceType::Memory,
        SourceType::BusinessLead,
        SourceType::PaperTrading,
        SourceType::Task,
        SourceType::Calendar,
        SourceType::AgentConfig,
        SourceType::Workspace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Memory => "memory",
            SourceType::BusinessLead => "business_lead",
            SourceType::PaperTrading => "paper_trading",
            SourceType::Task => "task",
            SourceType::Calendar => "calendar",
            SourceType::AgentConfig => "agent_config",
            SourceType::Workspace => "workspace",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| CoreError::validation(format!("unknown source type: '{}'", s)))
    }
}

/// File type helpers.
///
/// File types are lowercase extensions without the dot. The allow-list is
/// configurable, so they stay plain strings rather than an enum.
pub struct FileType;

impl FileType {
    /// Normalize a user-supplied file type filter: lowercase, no leading dot,
    /// and common long names mapped to their extension.
    pub fn normalize(raw: &str) -> String {
        let lower = raw.trim().trim_start_matches('.').to_ascii_lowercase();
        match lower.as_str() {
            "markdown" => "md".to_string(),
            "text" | "plain" => "txt".to_string(),
            _ => lower,
        }
    }

    /// Media type stored as a chunk's `contentType`.
    pub fn content_type(file_type: &str) -> &'static str {
        match file_type {
            "md" => "text/markdown",
            "csv" => "text/csv",
            "json" => "application/json",
            _ => "text/plain",
        }
    }

    /// Whether files of this type are chunked by header structure.
    pub fn is_outline(file_type: &str) -> bool {
        file_type == "md"
    }
}

/// One searchable unit of a workspace file, as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedChunk {
    pub id: String,
    pub file_path: String,
    pub title: String,
    pub content: String,
    pub file_type: String,
    pub source_type: SourceType,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub last_indexed: i64,
}

/// A chunk waiting to be written; file-level fields live on [`FileChunkSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub title: String,
    pub content: String,
    pub line_number: Option<i64>,
    pub line_end: Option<i64>,
    pub context: Option<String>,
}

/// The complete replacement chunk set for one file.
///
/// Stores write a set atomically: every previous chunk for `file_path` is
/// removed and the new chunks are inserted with a shared `last_indexed`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileChunkSet {
    pub file_path: String,
    pub file_type: String,
    pub source_type: SourceType,
    pub content_type: String,
    pub chunks: Vec<NewChunk>,
}

/// Grouped view of the index for one file path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedFile {
    pub file_path: String,
    pub file_type: String,
    pub source_type: SourceType,
    /// Oldest `last_indexed` among the file's chunks.
    pub last_indexed: i64,
    pub chunk_count: usize,
}

/// Transient scan result for one indexable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Path relative to the workspace root, `/`-separated.
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
    /// Modification time in Unix milliseconds.
    pub modified: i64,
}

// ============ Activity feed ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Failed,
    Pending,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Success => "success",
            ActivityStatus::Failed => "failed",
            ActivityStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(ActivityStatus::Success),
            "failed" => Ok(ActivityStatus::Failed),
            "pending" => Ok(ActivityStatus::Pending),
            other => Err(CoreError::validation(format!(
                "unknown activity status: '{}'. Must be success, failed, or pending.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An activity as submitted by a producer. The timestamp is assigned by the
/// store at write time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub action_type: String,
    pub description: String,
    pub status: ActivityStatus,
    #[serde(default)]
    pub metadata: Option<ActivityMetadata>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: String,
    pub timestamp: i64,
    pub action_type: String,
    pub description: String,
    pub status: ActivityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ActivityMetadata>,
    pub source: String,
}

// ============ Scheduled tasks ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Paused,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Paused => "paused",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TaskStatus::Active),
            "paused" => Ok(TaskStatus::Paused),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(CoreError::validation(format!(
                "unknown task status: '{}'. Must be active, paused, or completed.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Cron,
    At,
    Every,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Cron => "cron",
            ScheduleType::At => "at",
            ScheduleType::Every => "every",
        }
    }
}

impl FromStr for ScheduleType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cron" => Ok(ScheduleType::Cron),
            "at" => Ok(ScheduleType::At),
            "every" => Ok(ScheduleType::Every),
            other => Err(CoreError::validation(format!(
                "unknown schedule type: '{}'. Must be cron, at, or every.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub id: String,
    pub name: String,
    pub description: String,
    pub schedule_type: ScheduleType,
    pub schedule_expr: String,
    pub command: String,
    pub next_run_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<i64>,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduledTask {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schedule_type")]
    pub schedule_type: ScheduleType,
    #[serde(default)]
    pub schedule_expr: String,
    #[serde(default)]
    pub command: String,
    pub next_run_at: i64,
}

fn default_schedule_type() -> ScheduleType {
    ScheduleType::Cron
}

/// A dated entry on the dashboard calendar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCalendarEvent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_type_round_trips_through_str() {
        for t in SourceType::ALL {
            assert_eq!(t.as_str().parse::<SourceType>().unwrap(), t);
        }
        assert!("nonsense".parse::<SourceType>().is_err());
    }

    #[test]
    fn file_type_aliases() {
        assert_eq!(FileType::normalize("markdown"), "md");
        assert_eq!(FileType::normalize(".MD"), "md");
        assert_eq!(FileType::normalize("text"), "txt");
        assert_eq!(FileType::normalize("csv"), "csv");
        assert_eq!(FileType::content_type("json"), "application/json");
        assert_eq!(FileType::content_type("unknown"), "text/plain");
    }

    #[test]
    fn chunk_serializes_camel_case() {
        let chunk = IndexedChunk {
            id: "c1".into(),
            file_path: "memory/a.md".into(),
            title: "a.md".into(),
            content: "hello".into(),
            file_type: "md".into(),
            source_type: SourceType::BusinessLead,
            content_type: "text/markdown".into(),
            line_number: Some(1),
            line_end: None,
            context: None,
            last_indexed: 5,
        };
        let v = serde_json::to_value(&chunk).unwrap();
        assert_eq!(v["filePath"], "memory/a.md");
        assert_eq!(v["sourceType"], "business_lead");
        assert_eq!(v["lastIndexed"], 5);
        assert!(v.get("lineEnd").is_none());
    }

    #[test]
    fn new_activity_deserializes_from_dashboard_shape() {
        let a: NewActivity = serde_json::from_str(
            r#"{"actionType":"file_write","description":"wrote","status":"failed","metadata":{"error":"disk full","duration":12}}"#,
        )
        .unwrap();
        assert_eq!(a.status, ActivityStatus::Failed);
        let meta = a.metadata.unwrap();
        assert_eq!(meta.error.as_deref(), Some("disk full"));
        assert_eq!(meta.duration, Some(12));
        assert!(a.source.is_none());
    }
}
