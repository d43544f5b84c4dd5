//! # Workspace Index
//!
//! Indexing, retrieval, and activity-feed backend for an AI agent dashboard.
//!
//! The agent works inside a single workspace directory: memory notes, task
//! lists, lead spreadsheets, daily logs. Workspace Index walks that tree,
//! classifies and chunks every indexable file, keeps the chunks in SQLite
//! (with an FTS5 mirror for keyword search), and records what the agent has
//! been doing in an append-only activity log.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────┐
//! │  Workspace  │──▶│     Indexer      │──▶│  SQLite  │
//! │   (scan)    │   │ classify + chunk │   │   FTS5   │
//! └─────────────┘   └──────────────────┘   └────┬─────┘
//!                                               │
//!                        ┌──────────────────────┤
//!                        ▼                      ▼
//!                   ┌──────────┐          ┌──────────┐
//!                   │   CLI    │          │   HTTP   │
//!                   │  (wsi)   │          │  (axum)  │
//!                   └──────────┘          └──────────┘
//! ```
//!
//! Domain types, the store traits, and the storage-agnostic services
//! (chunking, classification, search, stats, activity feed, tasks) live in
//! the `workspace-index-core` crate. This crate adds the SQLite store, the
//! filesystem scanner, the indexing pipeline, the CLI, and the server.
//!
//! ## Quick Start
//!
//! ```bash
//! wsi init                      # create database
//! wsi reindex                   # index new and changed files
//! wsi search "quarterly goals" --source-type memory
//! wsi activity list
//! wsi serve                     # start the dashboard API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the store traits |
//! | [`scan`] | Workspace walking and file summaries |
//! | [`indexer`] | Incremental reindex pipeline |
//! | [`cli`] | CLI command runners |
//! | [`server`] | Dashboard HTTP server |

pub mod cli;
pub mod config;
pub mod db;
pub mod indexer;
pub mod migrate;
pub mod scan;
pub mod server;
pub mod sqlite_store;
