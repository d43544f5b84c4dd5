//! # Workspace Index CLI (`wsi`)
//!
//! The `wsi` binary indexes an agent workspace, searches it, records agent
//! activity, and serves the dashboard HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! wsi --config ./config/wsi.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wsi init` | Create the SQLite database and run schema migrations |
//! | `wsi scan` | List indexable workspace files |
//! | `wsi reindex` | Index new and changed files |
//! | `wsi search "<query>"` | Search indexed chunks |
//! | `wsi stats` | Index statistics |
//! | `wsi files` | Indexed files grouped by path |
//! | `wsi clear <path>` | Drop one file from the index |
//! | `wsi activity log\|list\|range\|stats` | Activity feed |
//! | `wsi tasks` | Scheduled tasks |
//! | `wsi serve` | Start the dashboard HTTP server |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use workspace_index::{cli, config, migrate, server};
use workspace_index_core::activity::ActivityQuery;
use workspace_index_core::models::{ActivityStatus, SourceType, TaskStatus};
use workspace_index_core::search::SearchFilters;
use workspace_index_core::store::SortOrder;

/// Workspace Index: indexing, retrieval, and activity feed for an agent
/// workspace.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/wsi.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "wsi",
    about = "Workspace Index: indexing, retrieval, and activity feed for an agent workspace",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/wsi.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// List indexable files in the workspace without indexing them.
    Scan,

    /// Index new and changed workspace files.
    ///
    /// A file is reindexed when it has never been indexed or was modified
    /// after its last index time. Ctrl-C stops after the current file.
    Reindex {
        /// Reindex every file regardless of modification time.
        #[arg(long)]
        full: bool,

        /// Also drop index entries for files that no longer exist.
        #[arg(long)]
        prune: bool,
    },

    /// Search indexed chunks.
    Search {
        /// The search query string.
        query: String,

        /// Only return chunks from files with this extension (e.g. `md`).
        #[arg(long)]
        file_type: Option<String>,

        /// Only return chunks of this source type (`memory`, `task`, `business_lead`, ...).
        #[arg(long, value_parser = cli::parse_source_type)]
        source_type: Option<SourceType>,

        /// Only return chunks of this MIME content type.
        #[arg(long)]
        content_type: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show index statistics.
    Stats,

    /// List indexed files.
    Files,

    /// Remove one file's chunks from the index.
    Clear {
        /// Workspace-relative path, as shown by `wsi files`.
        path: String,
    },

    /// Record and inspect agent activity.
    Activity {
        #[command(subcommand)]
        action: ActivityAction,
    },

    /// List scheduled tasks.
    Tasks {
        /// Only show tasks with this status (`active`, `paused`, `completed`).
        #[arg(long)]
        status: Option<TaskStatus>,
    },

    /// Start the dashboard HTTP server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum ActivityAction {
    /// Append an activity record.
    Log {
        /// Action type (e.g. `file_write`, `search`, `reindex`).
        #[arg(long)]
        action_type: String,

        /// Human-readable description.
        #[arg(long)]
        description: String,

        /// `success`, `failed`, or `pending`.
        #[arg(long, default_value = "success")]
        status: ActivityStatus,

        /// Producer of the activity. Defaults to `agent`.
        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        file_path: Option<String>,

        #[arg(long)]
        task_id: Option<String>,

        /// Duration in milliseconds.
        #[arg(long)]
        duration: Option<i64>,

        #[arg(long)]
        error: Option<String>,
    },

    /// Newest-first page of activity.
    List {
        #[arg(long)]
        limit: Option<usize>,

        /// Only records strictly older than this timestamp (Unix ms).
        #[arg(long)]
        cursor: Option<i64>,

        #[arg(long)]
        action_type: Option<String>,
    },

    /// Activity between two timestamps (Unix ms, inclusive).
    Range {
        #[arg(long)]
        start: i64,

        #[arg(long)]
        end: i64,

        /// `asc` or `desc`.
        #[arg(long, default_value = "desc", value_parser = cli::parse_order)]
        order: SortOrder,
    },

    /// Counters over the configured rolling window.
    Stats,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Scan => {
            cli::run_scan(&cfg)?;
        }
        Commands::Reindex { full, prune } => {
            cli::run_reindex(&cfg, full, prune).await?;
        }
        Commands::Search {
            query,
            file_type,
            source_type,
            content_type,
            limit,
        } => {
            let mut filters = SearchFilters::new();
            if let Some(ft) = file_type.as_deref() {
                filters = filters.file_type(ft);
            }
            if let Some(st) = source_type {
                filters = filters.source_type(st);
            }
            if let Some(ct) = content_type.as_deref() {
                filters = filters.content_type(ct);
            }
            cli::run_search(&cfg, &query, filters, limit).await?;
        }
        Commands::Stats => {
            cli::run_stats(&cfg).await?;
        }
        Commands::Files => {
            cli::run_files(&cfg).await?;
        }
        Commands::Clear { path } => {
            cli::run_clear(&cfg, &path).await?;
        }
        Commands::Activity { action } => match action {
            ActivityAction::Log {
                action_type,
                description,
                status,
                source,
                file_path,
                task_id,
                duration,
                error,
            } => {
                cli::run_activity_log(
                    &cfg,
                    cli::LogArgs {
                        action_type,
                        description,
                        status,
                        source,
                        file_path,
                        task_id,
                        duration,
                        error,
                    },
                )
                .await?;
            }
            ActivityAction::List {
                limit,
                cursor,
                action_type,
            } => {
                cli::run_activity_list(
                    &cfg,
                    ActivityQuery {
                        limit,
                        cursor,
                        action_type,
                    },
                )
                .await?;
            }
            ActivityAction::Range { start, end, order } => {
                cli::run_activity_range(&cfg, start, end, order).await?;
            }
            ActivityAction::Stats => {
                cli::run_activity_stats(&cfg).await?;
            }
        },
        Commands::Tasks { status } => {
            cli::run_tasks_list(&cfg, status).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
