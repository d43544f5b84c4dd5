//! Structure-aware text chunker.
//!
//! Splits file content into [`ChunkSpan`]s that the indexer turns into
//! stored chunks. Two strategies:
//!
//! - **Flat** (CSV, text, JSON): greedy line packing. Lines are appended to a
//!   buffer until the next line would push it past `max_chunk_chars`; the
//!   buffer is then closed and a new one starts with that line. A line is
//!   never split, so a chunk holding one very long line may exceed the
//!   threshold.
//! - **Outline** (Markdown): a line starting with `#` opens a new chunk when
//!   the current chunk already has non-whitespace content. Chunks whose
//!   significant length (see [`significant_len`]) is below `min_chunk_chars`
//!   are discarded as noise.
//!
//! Every chunk after the first carries the tail of the previous chunk as
//! `context`. Stored text is capped at `max_content_chars`; the cap is a
//! storage limit and is independent of the chunking threshold.
//!
//! # Example
//!
//! ```rust
//! use workspace_index_core::chunk::{chunk_content, ChunkerConfig};
//!
//! let spans = chunk_content("# A\nhello\n# B\nworld\n", true, &ChunkerConfig::default());
//! assert_eq!(spans.len(), 2);
//! assert_eq!(spans[1].line_start, 3);
//! assert_eq!(spans[1].context.as_deref(), Some("# A\nhello\n"));
//! ```

/// Header marker that opens a new outline section.
const HEADER_MARKER: char = '#';

/// Chunking parameters. All lengths are in characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Flat-mode packing threshold.
    pub max_chunk_chars: usize,
    /// Hard cap on stored chunk text.
    pub max_content_chars: usize,
    /// Outline chunks shorter than this are dropped.
    pub min_chunk_chars: usize,
    /// Length of the previous-chunk tail stored as `context`.
    pub context_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 1000,
            max_content_chars: 10_000,
            min_chunk_chars: 10,
            context_chars: 100,
        }
    }
}

/// One chunk of a file, with 1-based inclusive line bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub text: String,
    pub line_start: usize,
    pub line_end: usize,
    pub context: Option<String>,
}

struct RawChunk {
    text: String,
    line_start: usize,
    line_end: usize,
}

/// Split `content` into chunks.
///
/// Whitespace-only content yields no chunks. Output is deterministic for a
/// given input and config.
pub fn chunk_content(content: &str, is_outline: bool, config: &ChunkerConfig) -> Vec<ChunkSpan> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let raw = if is_outline {
        split_outline(content)
    } else {
        pack_lines(content, config.max_chunk_chars)
    };

    let mut spans: Vec<ChunkSpan> = Vec::with_capacity(raw.len());
    let mut previous: Option<String> = None;

    for chunk in raw {
        if chunk.text.trim().is_empty() {
            continue;
        }
        if is_outline && significant_len(&chunk.text) < config.min_chunk_chars {
            continue;
        }

        let context = previous
            .as_deref()
            .map(|prev| tail_chars(prev, config.context_chars).to_string());
        let text = truncate_chars(&chunk.text, config.max_content_chars).to_string();
        previous = Some(chunk.text);

        spans.push(ChunkSpan {
            text,
            line_start: chunk.line_start,
            line_end: chunk.line_end,
            context,
        });
    }

    spans
}

/// Lines of `content` split on `\n`. A trailing newline does not produce an
/// extra empty line.
fn lines(content: &str) -> impl Iterator<Item = &str> {
    let body = content.strip_suffix('\n').unwrap_or(content);
    body.split('\n')
}

fn pack_lines(content: &str, max_chars: usize) -> Vec<RawChunk> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;
    let mut line_start = 1usize;
    let mut last_line = 0usize;

    for (i, line) in lines(content).enumerate() {
        let line_no = i + 1;
        let line_chars = line.chars().count();

        if !buf.is_empty() && buf_chars + line_chars > max_chars {
            chunks.push(RawChunk {
                text: std::mem::take(&mut buf),
                line_start,
                line_end: line_no - 1,
            });
            buf_chars = 0;
            line_start = line_no;
        }

        buf.push_str(line);
        buf.push('\n');
        buf_chars += line_chars + 1;
        last_line = line_no;
    }

    if !buf.is_empty() {
        chunks.push(RawChunk {
            text: buf,
            line_start,
            line_end: last_line,
        });
    }

    chunks
}

fn split_outline(content: &str) -> Vec<RawChunk> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut line_start = 1usize;
    let mut last_line = 0usize;

    for (i, line) in lines(content).enumerate() {
        let line_no = i + 1;

        if line.starts_with(HEADER_MARKER) && !buf.trim().is_empty() {
            chunks.push(RawChunk {
                text: std::mem::take(&mut buf),
                line_start,
                line_end: line_no - 1,
            });
            line_start = line_no;
        }

        buf.push_str(line);
        buf.push('\n');
        last_line = line_no;
    }

    if !buf.trim().is_empty() {
        chunks.push(RawChunk {
            text: buf,
            line_start,
            line_end: last_line,
        });
    }

    chunks
}

/// First `max` characters of `s`, cut on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Length of `text` without surrounding blank padding.
///
/// Leading and trailing whitespace is ignored, except that the newline
/// ending the last non-blank line counts as part of that line. A header
/// followed by blank lines therefore measures the same as the bare header
/// line.
pub fn significant_len(text: &str) -> usize {
    let body = text.trim();
    let terminated = text
        .trim_start()
        .get(body.len()..)
        .map_or(false, |rest| rest.starts_with('\n'));
    body.chars().count() + usize::from(terminated)
}

/// Last `n` characters of `s`, cut on a char boundary.
pub fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(max_chunk_chars: usize) -> ChunkerConfig {
        ChunkerConfig {
            max_chunk_chars,
            ..ChunkerConfig::default()
        }
    }

    #[test]
    fn test_empty_and_whitespace_yield_nothing() {
        assert!(chunk_content("", false, &cfg(1000)).is_empty());
        assert!(chunk_content("  \n\n\t\n", true, &cfg(1000)).is_empty());
    }

    #[test]
    fn test_small_flat_text_single_chunk() {
        let spans = chunk_content("a,b\n1,2\n", false, &cfg(1000));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "a,b\n1,2\n");
        assert_eq!(spans[0].line_start, 1);
        assert_eq!(spans[0].line_end, 2);
        assert!(spans[0].context.is_none());
    }

    #[test]
    fn test_flat_never_splits_a_line() {
        let content: String = (0..200)
            .map(|i| format!("row {} with some padding text", i))
            .collect::<Vec<_>>()
            .join("\n");
        let spans = chunk_content(&content, false, &cfg(120));
        assert!(spans.len() > 1);

        let rebuilt: String = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(rebuilt, format!("{}\n", content));
        for s in &spans {
            assert!(s.text.ends_with('\n'));
            assert!(s.text.chars().count() <= 120 + 40);
        }
    }

    #[test]
    fn test_flat_line_ranges_are_contiguous() {
        let content = "aaaa\nbbbb\ncccc\ndddd\neeee\n";
        let spans = chunk_content(content, false, &cfg(10));
        let mut expected_start = 1;
        for s in &spans {
            assert_eq!(s.line_start, expected_start);
            assert!(s.line_end >= s.line_start);
            expected_start = s.line_end + 1;
        }
        assert_eq!(expected_start, 6);
    }

    #[test]
    fn test_flat_oversized_single_line_kept_whole() {
        let long = "x".repeat(2500);
        let content = format!("short\n{}\ntail\n", long);
        let spans = chunk_content(&content, false, &cfg(1000));
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].text, format!("{}\n", long));
        assert_eq!(spans[1].line_start, 2);
        assert_eq!(spans[1].line_end, 2);
    }

    #[test]
    fn test_outline_splits_before_headers() {
        let content = "# A\nhello\n# B\nworld\n";
        let spans = chunk_content(content, true, &ChunkerConfig::default());
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "# A\nhello\n");
        assert_eq!((spans[0].line_start, spans[0].line_end), (1, 2));
        assert_eq!(spans[1].text, "# B\nworld\n");
        assert_eq!((spans[1].line_start, spans[1].line_end), (3, 4));
    }

    #[test]
    fn test_outline_boundary_only_at_header_lines() {
        let content = "intro line one\n\n# One\nbody one\nmore body\n## Two\nbody two is here\n# Three\nbody three is here\n";
        let spans = chunk_content(content, true, &ChunkerConfig::default());
        let lines: Vec<&str> = content.lines().collect();
        for s in spans.iter().skip(1) {
            assert!(lines[s.line_start - 1].starts_with('#'));
            assert!(s.text.starts_with('#'));
        }
        assert_eq!(spans.len(), 4);
    }

    #[test]
    fn test_outline_leading_header_does_not_create_empty_chunk() {
        let content = "# Title\n# Subtitle\nsome body text here\n";
        let spans = chunk_content(content, true, &ChunkerConfig::default());
        // "# Title\n" is 8 chars, below the minimum
        assert_eq!(spans.len(), 1);
        assert!(spans[0].text.starts_with("# Subtitle"));
        assert_eq!(spans[0].line_start, 2);
    }

    #[test]
    fn test_outline_discards_short_chunks() {
        let content = "# A\nok\n# Real section\nwith enough content\n";
        let spans = chunk_content(content, true, &ChunkerConfig::default());
        assert_eq!(spans.len(), 1);
        assert!(spans[0].text.starts_with("# Real section"));
        // context comes from the previous *emitted* chunk
        assert!(spans[0].context.is_none());
    }

    #[test]
    fn test_outline_blank_padding_does_not_count_toward_minimum() {
        let content = "# Title\n\n\n\n# Body section here\n";
        let spans = chunk_content(content, true, &ChunkerConfig::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "# Body section here\n");
        assert_eq!(spans[0].line_start, 5);

        let padded = "   \n# Hi\n\n\t\n   \n# Second part with body\n";
        let spans = chunk_content(padded, true, &ChunkerConfig::default());
        assert_eq!(spans.len(), 1);
        assert!(spans[0].text.starts_with("# Second"));
    }

    #[test]
    fn test_significant_len_ignores_padding() {
        assert_eq!(significant_len("# Title\n\n\n\n"), 8);
        assert_eq!(significant_len("# Title\n"), 8);
        assert_eq!(significant_len("# Title"), 7);
        assert_eq!(significant_len("\n\n  # A\nhello\n  \n"), 10);
        assert_eq!(significant_len(" \n\t "), 0);
    }

    #[test]
    fn test_context_is_tail_of_previous_chunk() {
        let first = format!("# First\n{}\n", "a".repeat(300));
        let content = format!("{}# Second\nbody of the second section\n", first);
        let spans = chunk_content(&content, true, &ChunkerConfig::default());
        assert_eq!(spans.len(), 2);
        let ctx = spans[1].context.as_deref().unwrap();
        assert_eq!(ctx.chars().count(), 100);
        assert!(first.ends_with(ctx));
    }

    #[test]
    fn test_content_truncated_to_cap() {
        let config = ChunkerConfig {
            max_content_chars: 50,
            ..ChunkerConfig::default()
        };
        let content = format!("# Big\n{}\n", "é".repeat(500));
        let spans = chunk_content(&content, true, &config);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text.chars().count(), 50);
    }

    #[test]
    fn test_deterministic() {
        let content = "# A\nalpha alpha\n# B\nbeta beta\n# C\ngamma gamma\n";
        let c1 = chunk_content(content, true, &ChunkerConfig::default());
        let c2 = chunk_content(content, true, &ChunkerConfig::default());
        assert_eq!(c1, c2);
        let f1 = chunk_content(content, false, &cfg(12));
        let f2 = chunk_content(content, false, &cfg(12));
        assert_eq!(f1, f2);
    }

    #[test]
    fn test_char_helpers_respect_utf8() {
        let s = "┌──┐ héllo";
        assert_eq!(truncate_chars(s, 3), "┌──");
        assert_eq!(tail_chars(s, 5), "héllo");
        assert_eq!(tail_chars(s, 100), s);
        assert_eq!(tail_chars(s, 0), "");
        assert_eq!(truncate_chars(s, 100), s);
    }
}
