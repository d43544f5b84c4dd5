//! Filtered full-text retrieval over the chunk index.
//!
//! The search functions operate entirely through the [`IndexStore`] trait.
//! Callers build a [`SearchFilters`] value once; the store adapter decides
//! how to apply it (SQL `WHERE` clauses, in-memory predicate, ...).
//!
//! # Filter semantics
//!
//! Every present filter must match (conjunction). Removing a filter can only
//! widen the result set. File type filters are normalized with
//! [`FileType::normalize`], so `markdown` and `.MD` both select `md` chunks.
//!
//! # Query gating
//!
//! Queries shorter than [`RetrievalLimits::min_query_chars`] characters after
//! trimming are not sent to the store; the caller receives an empty result.

use anyhow::Result;
use serde::Serialize;

use crate::error::CoreError;
use crate::models::{FileType, IndexedChunk, SourceType};
use crate::store::IndexStore;

/// Characters of chunk content used as match context when a chunk carries
/// no `context` of its own.
pub const MATCH_CONTEXT_CHARS: usize = 200;

/// Typed conjunctive filter set passed to [`IndexStore::search`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub file_type: Option<String>,
    pub source_type: Option<SourceType>,
    pub content_type: Option<String>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_type(mut self, file_type: &str) -> Self {
        self.file_type = Some(FileType::normalize(file_type));
        self
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.trim().to_ascii_lowercase());
        self
    }

    /// Build filters from raw request parameters. Blank values are ignored;
    /// an unknown source type is a validation error.
    pub fn from_params(
        file_type: Option<&str>,
        source_type: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Self, CoreError> {
        let mut filters = SearchFilters::new();
        if let Some(ft) = non_blank(file_type) {
            filters = filters.file_type(ft);
        }
        if let Some(st) = non_blank(source_type) {
            filters = filters.source_type(st.parse()?);
        }
        if let Some(ct) = non_blank(content_type) {
            filters = filters.content_type(ct);
        }
        Ok(filters)
    }

    pub fn is_empty(&self) -> bool {
        self.file_type.is_none() && self.source_type.is_none() && self.content_type.is_none()
    }

    /// Whether `chunk` satisfies every present filter.
    pub fn matches(&self, chunk: &IndexedChunk) -> bool {
        self.file_type
            .as_deref()
            .map_or(true, |ft| chunk.file_type == ft)
            && self.source_type.map_or(true, |st| chunk.source_type == st)
            && self
                .content_type
                .as_deref()
                .map_or(true, |ct| chunk.content_type == ct)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Result-size and query-length bounds, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalLimits {
    pub default_limit: usize,
    pub max_limit: usize,
    pub min_query_chars: usize,
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            min_query_chars: 2,
        }
    }
}

impl RetrievalLimits {
    /// Requested limit, defaulted and clamped to `1..=max_limit`.
    pub fn effective(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// Bundles all inputs for a single search invocation.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub filters: SearchFilters,
    pub limit: Option<usize>,
}

/// A search result with the text the dashboard shows around the match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub chunk: IndexedChunk,
    pub match_context: String,
}

/// Whether `query` is long enough to be worth running.
pub fn should_query(query: &str, min_query_chars: usize) -> bool {
    query.trim().chars().count() >= min_query_chars
}

/// Run a filtered full-text search. Returns at most the effective limit.
pub async fn search<S: IndexStore + ?Sized>(
    store: &S,
    req: &SearchRequest<'_>,
    limits: &RetrievalLimits,
) -> Result<Vec<IndexedChunk>> {
    if !should_query(req.query, limits.min_query_chars) {
        return Ok(Vec::new());
    }
    let limit = limits.effective(req.limit);
    let mut results = store.search(req.query.trim(), &req.filters, limit).await?;
    results.truncate(limit);
    tracing::debug!(query = req.query, hits = results.len(), "search");
    Ok(results)
}

/// [`search`], with each result paired with its match context.
pub async fn search_with_context<S: IndexStore + ?Sized>(
    store: &S,
    req: &SearchRequest<'_>,
    limits: &RetrievalLimits,
) -> Result<Vec<SearchHit>> {
    let chunks = search(store, req, limits).await?;
    Ok(chunks
        .into_iter()
        .map(|chunk| SearchHit {
            match_context: match_context(&chunk),
            chunk,
        })
        .collect())
}

/// The chunk's stored context, or the start of its content.
pub fn match_context(chunk: &IndexedChunk) -> String {
    match chunk.context.as_deref() {
        Some(ctx) if !ctx.is_empty() => ctx.to_string(),
        _ => crate::chunk::truncate_chars(&chunk.content, MATCH_CONTEXT_CHARS).to_string(),
    }
}

/// Most recently indexed chunks, newest first.
pub async fn recent_indexed<S: IndexStore + ?Sized>(
    store: &S,
    limit: Option<usize>,
    limits: &RetrievalLimits,
) -> Result<Vec<IndexedChunk>> {
    store.recent_chunks(limits.effective(limit)).await
}
