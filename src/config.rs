//! Configuration parsing and validation.
//!
//! Workspace Index is configured via a TOML file (default:
//! `config/wsi.toml`). Only `[db]` and `[workspace]` are required; every
//! other section falls back to defaults.
//!
//! # Example
//!
//! ```toml
//! [db]
//! path = "./data/wsi.sqlite"
//!
//! [workspace]
//! root = "/home/agent/workspace"
//! extensions = ["md", "csv", "txt", "json"]
//!
//! [chunking]
//! max_chunk_chars = 1000
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use workspace_index_core::activity::FeedSettings;
use workspace_index_core::chunk::ChunkerConfig;
use workspace_index_core::search::RetrievalLimits;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceConfig {
    /// Absolute path of the directory tree to index.
    pub root: PathBuf,
    /// Indexable file extensions, lowercase, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Directory names skipped in addition to dot-directories.
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    ["md", "csv", "txt", "json"].map(String::from).to_vec()
}
fn default_skip_dirs() -> Vec<String> {
    ["node_modules", "dist", "build", "target"]
        .map(String::from)
        .to_vec()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            max_content_chars: default_max_content_chars(),
            min_chunk_chars: default_min_chunk_chars(),
            context_chars: default_context_chars(),
        }
    }
}

fn default_max_chunk_chars() -> usize {
    1000
}
fn default_max_content_chars() -> usize {
    10_000
}
fn default_min_chunk_chars() -> usize {
    10
}
fn default_context_chars() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndexingConfig {
    /// Clear index entries whose file disappeared from the workspace.
    #[serde(default)]
    pub prune_missing: bool,
    /// Cancel a reindex pass that runs longer than this many seconds.
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            min_query_chars: default_min_query_chars(),
        }
    }
}

fn default_limit() -> usize {
    20
}
fn default_max_limit() -> usize {
    100
}
fn default_min_query_chars() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActivityConfig {
    #[serde(default = "default_activity_limit")]
    pub default_limit: usize,
    #[serde(default = "default_activity_max_limit")]
    pub max_limit: usize,
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            default_limit: default_activity_limit(),
            max_limit: default_activity_max_limit(),
            window_hours: default_window_hours(),
        }
    }
}

fn default_activity_limit() -> usize {
    50
}
fn default_activity_max_limit() -> usize {
    500
}
fn default_window_hours() -> i64 {
    24
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    pub fn chunker(&self) -> ChunkerConfig {
        ChunkerConfig {
            max_chunk_chars: self.chunking.max_chunk_chars,
            max_content_chars: self.chunking.max_content_chars,
            min_chunk_chars: self.chunking.min_chunk_chars,
            context_chars: self.chunking.context_chars,
        }
    }

    pub fn retrieval_limits(&self) -> RetrievalLimits {
        RetrievalLimits {
            default_limit: self.retrieval.default_limit,
            max_limit: self.retrieval.max_limit,
            min_query_chars: self.retrieval.min_query_chars,
        }
    }

    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            default_limit: self.activity.default_limit,
            max_limit: self.activity.max_limit,
            window_hours: self.activity.window_hours,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&mut config)?;
    Ok(config)
}

fn validate(config: &mut Config) -> Result<()> {
    // Validate workspace
    if !config.workspace.root.is_absolute() {
        anyhow::bail!(
            "workspace.root must be an absolute path, got '{}'",
            config.workspace.root.display()
        );
    }
    if config.workspace.extensions.is_empty() {
        anyhow::bail!("workspace.extensions must not be empty");
    }
    for ext in config.workspace.extensions.iter_mut() {
        *ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    }

    // Validate chunking
    let chunking = &config.chunking;
    if chunking.max_chunk_chars == 0 {
        anyhow::bail!("chunking.max_chunk_chars must be > 0");
    }
    if chunking.max_content_chars < chunking.max_chunk_chars {
        anyhow::bail!("chunking.max_content_chars must be >= chunking.max_chunk_chars");
    }

    // Validate retrieval
    let retrieval = &config.retrieval;
    if retrieval.max_limit < 1 {
        anyhow::bail!("retrieval.max_limit must be >= 1");
    }
    if !(1..=retrieval.max_limit).contains(&retrieval.default_limit) {
        anyhow::bail!(
            "retrieval.default_limit must be in [1, {}]",
            retrieval.max_limit
        );
    }

    // Validate activity
    let activity = &config.activity;
    if !(1..=activity.max_limit).contains(&activity.default_limit) {
        anyhow::bail!(
            "activity.default_limit must be in [1, {}]",
            activity.max_limit
        );
    }
    if activity.window_hours < 1 {
        anyhow::bail!("activity.window_hours must be >= 1");
    }

    if config.indexing.deadline_secs == Some(0) {
        anyhow::bail!("indexing.deadline_secs must be > 0 when set");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let mut config: Config = toml::from_str(toml_str)?;
        validate(&mut config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = parse(
            r#"
            [db]
            path = "./data/wsi.sqlite"

            [workspace]
            root = "/srv/workspace"
            "#,
        )
        .unwrap();
        assert_eq!(config.workspace.extensions, vec!["md", "csv", "txt", "json"]);
        assert!(config.workspace.skip_dirs.contains(&"node_modules".to_string()));
        assert_eq!(config.chunker(), ChunkerConfig::default());
        assert_eq!(config.retrieval_limits(), RetrievalLimits::default());
        assert_eq!(config.feed_settings(), FeedSettings::default());
        assert_eq!(config.server.bind, "127.0.0.1:7341");
        assert!(!config.indexing.prune_missing);
    }

    #[test]
    fn test_extensions_are_normalized() {
        let config = parse(
            r#"
            [db]
            path = "x.sqlite"
            [workspace]
            root = "/w"
            extensions = [".MD", "Txt"]
            "#,
        )
        .unwrap();
        assert_eq!(config.workspace.extensions, vec!["md", "txt"]);
    }

    #[test]
    fn test_relative_root_rejected() {
        let err = parse(
            r#"
            [db]
            path = "x.sqlite"
            [workspace]
            root = "relative/dir"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn test_bad_limits_rejected() {
        let err = parse(
            r#"
            [db]
            path = "x.sqlite"
            [workspace]
            root = "/w"
            [retrieval]
            default_limit = 500
            max_limit = 100
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("retrieval.default_limit"));

        let err = parse(
            r#"
            [db]
            path = "x.sqlite"
            [workspace]
            root = "/w"
            [chunking]
            max_chunk_chars = 5000
            max_content_chars = 100
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_content_chars"));
    }
}
