//! # Workspace Index Core
//!
//! Storage-agnostic logic for Workspace Index: data models, the content
//! classifier, the structure-aware chunker, store traits, filtered search,
//! index statistics, the activity feed, scheduled tasks, and calendar events.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Persistence is
//! reached only through the traits in [`store`]; [`store::memory`] provides
//! an in-process implementation used by tests.

pub mod activity;
pub mod calendar;
pub mod chunk;
pub mod classify;
pub mod error;
pub mod models;
pub mod search;
pub mod stats;
pub mod store;
pub mod tasks;

pub use error::CoreError;
pub use models::{FileType, SourceType};
