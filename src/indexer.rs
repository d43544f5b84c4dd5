//! Incremental indexing pipeline.
//!
//! Coordinates one reindex pass: scan → staleness check → read → classify →
//! chunk → replace-set upsert. A file is stale when the index has no entry
//! for its path or the entry's `last_indexed` is older than the file's
//! modification time. Fresh files are left untouched.
//!
//! Per-file failures are logged and counted; they never abort the pass. A
//! failed file keeps its previous chunks and is retried on the next pass.
//!
//! The pass checks a [`CancellationToken`] before every file. A cancelled
//! pass returns what it has done so far with `cancelled = true`.

use anyhow::Result;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use workspace_index_core::chunk::{chunk_content, ChunkerConfig};
use workspace_index_core::classify::classify;
use workspace_index_core::models::{FileChunkSet, FileEntry, FileType, NewChunk};
use workspace_index_core::store::IndexStore;

use crate::config::Config;
use crate::scan::{scan_workspace, ScanOptions};

#[derive(Debug, Clone, Default)]
pub struct IndexerOptions {
    pub scan: ScanOptions,
    pub chunker: ChunkerConfig,
    /// Treat every file as stale.
    pub full: bool,
    /// Clear index entries whose file is no longer in the workspace.
    pub prune_missing: bool,
}

impl IndexerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scan: ScanOptions::from(&config.workspace),
            chunker: config.chunker(),
            full: false,
            prune_missing: config.indexing.prune_missing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Indexed,
    Skipped,
    Empty,
    Failed,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: String,
    pub status: FileStatus,
    pub chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexSummary {
    pub scanned: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub empty: usize,
    pub failed: usize,
    pub removed: usize,
    pub cancelled: bool,
    pub files: Vec<FileOutcome>,
}

impl ReindexSummary {
    fn record(&mut self, path: &str, status: FileStatus, chunks: usize, error: Option<String>) {
        match status {
            FileStatus::Indexed => self.indexed += 1,
            FileStatus::Skipped => self.skipped += 1,
            FileStatus::Empty => self.empty += 1,
            FileStatus::Failed => self.failed += 1,
            FileStatus::Removed => self.removed += 1,
        }
        self.files.push(FileOutcome {
            path: path.to_string(),
            status,
            chunks,
            error,
        });
    }
}

/// Whether a scanned file needs reindexing given its indexed watermark.
pub fn is_stale(entry: &FileEntry, last_indexed: Option<i64>) -> bool {
    match last_indexed {
        None => true,
        Some(ts) => ts < entry.modified,
    }
}

/// Classify and chunk one file. Returns `None` when no chunk survives.
///
/// The first chunk is titled with the file name; chunk `n >= 2` is titled
/// `"<name> (part n)"`.
pub fn build_chunk_set(entry: &FileEntry, content: &str, chunker: &ChunkerConfig) -> Option<FileChunkSet> {
    let spans = chunk_content(content, FileType::is_outline(&entry.file_type), chunker);
    if spans.is_empty() {
        return None;
    }

    let chunks = spans
        .into_iter()
        .enumerate()
        .map(|(i, span)| NewChunk {
            title: if i == 0 {
                entry.name.clone()
            } else {
                format!("{} (part {})", entry.name, i + 1)
            },
            content: span.text,
            line_number: Some(span.line_start as i64),
            line_end: Some(span.line_end as i64),
            context: span.context,
        })
        .collect();

    Some(FileChunkSet {
        file_path: entry.path.clone(),
        file_type: entry.file_type.clone(),
        source_type: classify(&entry.path),
        content_type: FileType::content_type(&entry.file_type).to_string(),
        chunks,
    })
}

/// Run one reindex pass over `root`.
pub async fn reindex<S: IndexStore + ?Sized>(
    store: &S,
    root: &Path,
    options: &IndexerOptions,
    cancel: &CancellationToken,
) -> Result<ReindexSummary> {
    let entries = scan_workspace(root, &options.scan)?;
    let indexed: HashMap<String, i64> = store
        .indexed_files()
        .await?
        .into_iter()
        .map(|f| (f.file_path, f.last_indexed))
        .collect();

    let mut summary = ReindexSummary {
        scanned: entries.len(),
        ..ReindexSummary::default()
    };

    for entry in &entries {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }

        let previous = indexed.get(&entry.path).copied();
        if !options.full && !is_stale(entry, previous) {
            summary.record(&entry.path, FileStatus::Skipped, 0, None);
            continue;
        }

        let content = match tokio::fs::read_to_string(root.join(&entry.path)).await {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(path = %entry.path, error = %err, "failed to read file");
                summary.record(&entry.path, FileStatus::Failed, 0, Some(err.to_string()));
                continue;
            }
        };

        let Some(set) = build_chunk_set(entry, &content, &options.chunker) else {
            if previous.is_some() {
                if let Err(err) = store.clear_file(&entry.path).await {
                    tracing::warn!(path = %entry.path, error = %err, "failed to clear emptied file");
                    summary.record(&entry.path, FileStatus::Failed, 0, Some(err.to_string()));
                    continue;
                }
            }
            tracing::debug!(path = %entry.path, "no indexable content");
            summary.record(&entry.path, FileStatus::Empty, 0, None);
            continue;
        };

        match store.replace_file_chunks(&set, now_ms()).await {
            Ok(written) => {
                tracing::debug!(path = %entry.path, chunks = written, source_type = %set.source_type, "indexed");
                summary.record(&entry.path, FileStatus::Indexed, written, None);
            }
            Err(err) => {
                tracing::warn!(path = %entry.path, error = %err, "failed to write chunks");
                summary.record(&entry.path, FileStatus::Failed, 0, Some(err.to_string()));
            }
        }
    }

    if options.prune_missing && !summary.cancelled {
        let present: HashSet<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        let mut orphans: Vec<&String> = indexed
            .keys()
            .filter(|p| !present.contains(p.as_str()))
            .collect();
        orphans.sort();

        for path in orphans {
            match store.clear_file(path).await {
                Ok(n) => summary.record(path, FileStatus::Removed, n, None),
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "failed to prune missing file");
                    summary.record(path, FileStatus::Failed, 0, Some(err.to_string()));
                }
            }
        }
    }

    tracing::info!(
        scanned = summary.scanned,
        indexed = summary.indexed,
        skipped = summary.skipped,
        empty = summary.empty,
        failed = summary.failed,
        removed = summary.removed,
        cancelled = summary.cancelled,
        "reindex pass finished"
    );
    Ok(summary)
}

/// Cancels the token after the deadline unless dropped first.
pub struct DeadlineGuard(Option<JoinHandle<()>>);

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

pub fn arm_deadline(cancel: &CancellationToken, deadline: Option<Duration>) -> DeadlineGuard {
    DeadlineGuard(deadline.map(|d| {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(d).await;
            tracing::warn!(secs = d.as_secs(), "reindex deadline reached, cancelling");
            token.cancel();
        })
    }))
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
