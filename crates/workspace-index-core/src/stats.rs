//! Index statistics.
//!
//! Stats are computed by a full pass over every stored chunk. There are no
//! maintained counters, so the numbers are always consistent with the index
//! at the moment of the call.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde::Serialize;

use crate::models::IndexedChunk;
use crate::store::IndexStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Number of stored chunks.
    pub total_indexed: usize,
    /// Number of distinct file paths.
    pub total_files: usize,
    pub by_file_type: BTreeMap<String, usize>,
    pub by_source_type: BTreeMap<String, usize>,
    /// Newest `lastIndexed` in the index; `None` when empty.
    pub last_index_time: Option<i64>,
}

/// Aggregate a chunk slice.
pub fn aggregate(chunks: &[IndexedChunk]) -> IndexStats {
    let mut stats = IndexStats {
        total_indexed: chunks.len(),
        ..IndexStats::default()
    };
    let mut paths = BTreeSet::new();

    for c in chunks {
        *stats.by_file_type.entry(c.file_type.clone()).or_default() += 1;
        *stats
            .by_source_type
            .entry(c.source_type.as_str().to_string())
            .or_default() += 1;
        stats.last_index_time = Some(
            stats
                .last_index_time
                .map_or(c.last_indexed, |t| t.max(c.last_indexed)),
        );
        paths.insert(c.file_path.as_str());
    }

    stats.total_files = paths.len();
    stats
}

pub async fn index_stats<S: IndexStore + ?Sized>(store: &S) -> Result<IndexStats> {
    let chunks = store.all_chunks().await?;
    Ok(aggregate(&chunks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileChunkSet, FileType, NewChunk, SourceType};
    use crate::store::memory::InMemoryStore;

    fn set(path: &str, file_type: &str, source_type: SourceType, n: usize) -> FileChunkSet {
        FileChunkSet {
            file_path: path.into(),
            file_type: file_type.into(),
            source_type,
            content_type: FileType::content_type(file_type).into(),
            chunks: (0..n)
                .map(|i| NewChunk {
                    title: path.into(),
                    content: format!("chunk {}", i),
                    line_number: None,
                    line_end: None,
                    context: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn empty_index() {
        let store = InMemoryStore::new();
        let stats = index_stats(&store).await.unwrap();
        assert_eq!(stats, IndexStats::default());
        assert!(stats.last_index_time.is_none());
    }

    #[tokio::test]
    async fn counts_and_watermark() {
        let store = InMemoryStore::new();
        store
            .replace_file_chunks(&set("memory/a.md", "md", SourceType::Memory, 2), 100)
            .await
            .unwrap();
        store
            .replace_file_chunks(&set("tasks.json", "json", SourceType::Task, 1), 300)
            .await
            .unwrap();
        store
            .replace_file_chunks(&set("notes.md", "md", SourceType::Workspace, 1), 200)
            .await
            .unwrap();

        let stats = index_stats(&store).await.unwrap();
        assert_eq!(stats.total_indexed, 4);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.by_file_type["md"], 3);
        assert_eq!(stats.by_file_type["json"], 1);
        assert_eq!(stats.by_source_type["memory"], 2);
        assert_eq!(stats.by_source_type["task"], 1);
        assert_eq!(stats.last_index_time, Some(300));

        let v = serde_json::to_value(&stats).unwrap();
        assert_eq!(v["totalIndexed"], 4);
        assert_eq!(v["bySourceType"]["workspace"], 1);
    }
}
