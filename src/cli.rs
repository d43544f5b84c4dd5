//! CLI command runners.
//!
//! Each `run_*` function opens the store, calls into the core services, and
//! prints a human-readable report to stdout. The HTTP server exposes the same
//! operations as JSON; see [`crate::server`].

use anyhow::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use workspace_index_core::activity::{ActivityFeed, ActivityQuery};
use workspace_index_core::models::{
    ActivityMetadata, ActivityRecord, ActivityStatus, NewActivity, SourceType, TaskStatus,
};
use workspace_index_core::search::{search_with_context, SearchFilters, SearchRequest};
use workspace_index_core::stats::index_stats;
use workspace_index_core::store::{IndexStore, SortOrder};
use workspace_index_core::tasks::{self, TaskFilter};

use crate::config::Config;
use crate::indexer::{arm_deadline, now_ms, reindex, FileStatus, IndexerOptions};
use crate::scan::{scan_workspace, ScanOptions};
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

/// Connect and make sure the schema exists.
pub async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    Ok(SqliteStore::new(pool))
}

/// `wsi scan`: list indexable files without touching the index.
pub fn run_scan(config: &Config) -> Result<()> {
    let entries = scan_workspace(
        &config.workspace.root,
        &ScanOptions::from(&config.workspace),
    )?;

    if entries.is_empty() {
        println!("No indexable files under {}", config.workspace.root.display());
        return Ok(());
    }

    println!(
        "  {:<48} {:>6} {:>10}   {}",
        "PATH", "TYPE", "SIZE", "MODIFIED"
    );
    println!("  {}", "-".repeat(82));
    for e in &entries {
        println!(
            "  {:<48} {:>6} {:>10}   {}",
            e.path,
            e.file_type,
            format_bytes(e.size),
            format_ts_relative(e.modified)
        );
    }
    println!();
    println!("{} files", entries.len());
    Ok(())
}

/// `wsi reindex`: run one pass, cancellable with Ctrl-C.
pub async fn run_reindex(config: &Config, full: bool, prune: bool) -> Result<()> {
    let store = open_store(config).await?;

    let mut options = IndexerOptions::from_config(config);
    options.full = full;
    options.prune_missing |= prune;

    let cancel = CancellationToken::new();
    let _deadline = arm_deadline(
        &cancel,
        config.indexing.deadline_secs.map(Duration::from_secs),
    );
    let ctrl_c = {
        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping after current file");
                token.cancel();
            }
        })
    };

    let result = reindex(&store, &config.workspace.root, &options, &cancel).await;
    ctrl_c.abort();
    let summary = result?;

    println!("reindex {}", config.workspace.root.display());
    for f in &summary.files {
        match f.status {
            FileStatus::Indexed => println!("  indexed  {} ({} chunks)", f.path, f.chunks),
            FileStatus::Removed => println!("  removed  {} ({} chunks)", f.path, f.chunks),
            FileStatus::Empty => println!("  empty    {}", f.path),
            FileStatus::Failed => println!(
                "  failed   {}: {}",
                f.path,
                f.error.as_deref().unwrap_or("unknown error")
            ),
            FileStatus::Skipped => {}
        }
    }
    println!("  scanned: {}", summary.scanned);
    println!("  indexed: {}", summary.indexed);
    println!("  skipped: {}", summary.skipped);
    println!("  empty: {}", summary.empty);
    println!("  failed: {}", summary.failed);
    if summary.removed > 0 {
        println!("  removed: {}", summary.removed);
    }
    if summary.cancelled {
        println!("cancelled");
    } else {
        println!("ok");
    }

    store.pool().close().await;
    Ok(())
}

/// `wsi search`: filtered keyword search.
pub async fn run_search(
    config: &Config,
    query: &str,
    filters: SearchFilters,
    limit: Option<usize>,
) -> Result<()> {
    let store = open_store(config).await?;
    let req = SearchRequest {
        query,
        filters,
        limit,
    };
    let hits = search_with_context(&store, &req, &config.retrieval_limits()).await?;

    if hits.is_empty() {
        println!("No results.");
        store.pool().close().await;
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let c = &hit.chunk;
        println!("{}. {} / {}", i + 1, c.source_type, c.title);
        println!("    file: {}", c.file_path);
        if let (Some(start), Some(end)) = (c.line_number, c.line_end) {
            println!("    lines: {}-{}", start, end);
        }
        println!("    type: {} ({})", c.file_type, c.content_type);
        println!("    indexed: {}", format_ts_relative(c.last_indexed));
        println!(
            "    excerpt: \"{}\"",
            hit.match_context.replace('\n', " ").trim()
        );
        println!("    id: {}", c.id);
        println!();
    }

    store.pool().close().await;
    Ok(())
}

/// `wsi stats`: index overview.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let stats = index_stats(&store).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Workspace Index Stats");
    println!("=====================");
    println!();
    println!("  Workspace:   {}", config.workspace.root.display());
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Files:       {}", stats.total_files);
    println!("  Chunks:      {}", stats.total_indexed);
    println!(
        "  Last index:  {}",
        stats
            .last_index_time
            .map(format_ts_relative)
            .unwrap_or_else(|| "never".to_string())
    );

    if !stats.by_source_type.is_empty() {
        println!();
        println!("  By source type:");
        for (source_type, count) in &stats.by_source_type {
            println!("    {:<12} {:>8}", source_type, count);
        }
    }
    if !stats.by_file_type.is_empty() {
        println!();
        println!("  By file type:");
        for (file_type, count) in &stats.by_file_type {
            println!("    {:<12} {:>8}", file_type, count);
        }
    }
    println!();

    store.pool().close().await;
    Ok(())
}

/// `wsi files`: indexed files grouped by path.
pub async fn run_files(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let files = store.indexed_files().await?;

    if files.is_empty() {
        println!("Index is empty.");
    } else {
        println!(
            "  {:<48} {:<10} {:>6}   {}",
            "PATH", "SOURCE", "CHUNKS", "INDEXED"
        );
        println!("  {}", "-".repeat(82));
        for f in &files {
            println!(
                "  {:<48} {:<10} {:>6}   {}",
                f.file_path,
                f.source_type.as_str(),
                f.chunk_count,
                format_ts_relative(f.last_indexed)
            );
        }
    }

    store.pool().close().await;
    Ok(())
}

/// `wsi clear <path>`: drop a file's chunks.
pub async fn run_clear(config: &Config, path: &str) -> Result<()> {
    let store = open_store(config).await?;
    let removed = store.clear_file(path).await?;
    println!("cleared {} ({} chunks)", path, removed);
    store.pool().close().await;
    Ok(())
}

/// Arguments of `wsi activity log`.
pub struct LogArgs {
    pub action_type: String,
    pub description: String,
    pub status: ActivityStatus,
    pub source: Option<String>,
    pub file_path: Option<String>,
    pub task_id: Option<String>,
    pub duration: Option<i64>,
    pub error: Option<String>,
}

pub async fn run_activity_log(config: &Config, args: LogArgs) -> Result<()> {
    let store = open_store(config).await?;
    let metadata = ActivityMetadata {
        file_path: args.file_path,
        task_id: args.task_id,
        duration: args.duration,
        error: args.error,
    };
    let activity = NewActivity {
        action_type: args.action_type,
        description: args.description,
        status: args.status,
        metadata: (metadata != ActivityMetadata::default()).then_some(metadata),
        source: args.source,
    };

    let feed = ActivityFeed::new(&store, config.feed_settings());
    let record = feed.log(activity, now_ms()).await?;
    println!("logged {} at {}", record.id, record.timestamp);

    store.pool().close().await;
    Ok(())
}

pub async fn run_activity_list(config: &Config, query: ActivityQuery) -> Result<()> {
    let store = open_store(config).await?;
    let feed = ActivityFeed::new(&store, config.feed_settings());
    let page = feed.list(&query).await?;

    if page.items.is_empty() {
        println!("No activity.");
    }
    for record in &page.items {
        print_activity(record);
    }
    if let Some(cursor) = page.next_cursor {
        println!();
        println!("more: --cursor {}", cursor);
    }

    store.pool().close().await;
    Ok(())
}

pub async fn run_activity_range(config: &Config, start: i64, end: i64, order: SortOrder) -> Result<()> {
    let store = open_store(config).await?;
    let feed = ActivityFeed::new(&store, config.feed_settings());
    let items = feed.list_by_range(start, end, order).await?;

    if items.is_empty() {
        println!("No activity.");
    }
    for record in &items {
        print_activity(record);
    }

    store.pool().close().await;
    Ok(())
}

pub async fn run_activity_stats(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let feed = ActivityFeed::new(&store, config.feed_settings());
    let stats = feed.stats(now_ms()).await?;

    println!("Activity (last {}h)", config.activity.window_hours);
    println!("  total:   {}", stats.total);
    println!("  success: {}", stats.success);
    println!("  failed:  {}", stats.failed);
    println!("  pending: {}", stats.pending);
    match &stats.last_activity {
        Some(last) => println!(
            "  last:    {} {} ({})",
            last.action_type,
            last.description,
            format_ts_relative(last.timestamp)
        ),
        None => println!("  last:    none"),
    }

    store.pool().close().await;
    Ok(())
}

fn print_activity(record: &ActivityRecord) {
    println!(
        "{}  {:<8} {:<16} {}",
        format_ts_iso(record.timestamp),
        record.status.as_str(),
        record.action_type,
        record.description
    );
    if let Some(error) = record.metadata.as_ref().and_then(|m| m.error.as_deref()) {
        println!("    error: {}", error);
    }
}

pub async fn run_tasks_list(config: &Config, status: Option<TaskStatus>) -> Result<()> {
    let store = open_store(config).await?;
    let filter = TaskFilter {
        status,
        ..TaskFilter::default()
    };
    let list = tasks::list(&store, &filter).await?;

    if list.is_empty() {
        println!("No scheduled tasks.");
    }
    for t in &list {
        println!(
            "{}  {:<10} {:<24} {} {}",
            format_ts_iso(t.next_run_at),
            t.status.as_str(),
            t.name,
            t.schedule_type.as_str(),
            t.schedule_expr
        );
        println!("    id: {}", t.id);
    }

    store.pool().close().await;
    Ok(())
}

/// Parse a `--source-type` flag value.
pub fn parse_source_type(raw: &str) -> Result<SourceType, String> {
    raw.parse::<SourceType>().map_err(|e| e.to_string())
}

/// Parse an `--order` flag value.
pub fn parse_order(raw: &str) -> Result<SortOrder, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        other => Err(format!("unknown order '{}': expected asc or desc", other)),
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix-millisecond timestamp as a relative string (e.g. "3 hours ago").
fn format_ts_relative(ts_ms: i64) -> String {
    let delta = (now_ms() - ts_ms) / 1000;

    if delta < 0 {
        return format_ts_iso(ts_ms);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts_ms)
    }
}

fn format_ts_iso(ts_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}
