//! Path-based content classifier.
//!
//! Maps a workspace-relative path to a [`SourceType`]. Matching is
//! case-insensitive substring matching evaluated against an ordered rule
//! table; the first matching rule wins, so more specific categories are
//! listed before generic ones.
//!
//! ```rust
//! use workspace_index_core::classify::classify;
//! use workspace_index_core::SourceType;
//!
//! assert_eq!(classify("memory/2024-05-01.md"), SourceType::Memory);
//! assert_eq!(classify("business_lead_task.csv"), SourceType::BusinessLead);
//! assert_eq!(classify("notes/ideas.txt"), SourceType::Workspace);
//! ```

use crate::models::SourceType;

/// File names (lowercased, relative to the root) that are memory documents
/// even though they live outside `memory/`.
const MEMORY_FILENAMES: &[&str] = &["memory.md"];

type Predicate = fn(&str) -> bool;

/// Ordered (predicate, category) table. Order is load-bearing.
const RULES: &[(Predicate, SourceType)] = &[
    (is_memory, SourceType::Memory),
    (|p: &str| p.contains("business_lead"), SourceType::BusinessLead),
    (|p: &str| p.contains("paper_trading") || p.contains("trading"), SourceType::PaperTrading),
    (|p: &str| p.contains("task") || p.contains("todo"), SourceType::Task),
    (|p: &str| p.contains("calendar") || p.contains("schedule"), SourceType::Calendar),
    (
        |p: &str| p.contains("agent") || p.contains("soul") || p.contains("user"),
        SourceType::AgentConfig,
    ),
];

fn is_memory(path: &str) -> bool {
    path.contains("memory/") || MEMORY_FILENAMES.contains(&path)
}

/// Classify a workspace-relative path. Total: unmatched paths are
/// [`SourceType::Workspace`].
pub fn classify(relative_path: &str) -> SourceType {
    let path = relative_path.replace('\\', "/").to_lowercase();
    RULES
        .iter()
        .find(|(matches, _)| matches(&path))
        .map(|(_, category)| *category)
        .unwrap_or(SourceType::Workspace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_directory_and_root_file() {
        assert_eq!(classify("memory/x.md"), SourceType::Memory);
        assert_eq!(classify("MEMORY.md"), SourceType::Memory);
        assert_eq!(classify("Memory/2024/notes.md"), SourceType::Memory);
        assert_eq!(classify("memory\\daily.md"), SourceType::Memory);
    }

    #[test]
    fn memory_filename_must_be_exact() {
        // "memory.md" nested elsewhere is not the root memory file.
        assert_eq!(classify("archive/memory.md.bak.txt"), SourceType::Workspace);
    }

    #[test]
    fn priority_order_business_lead_before_task() {
        assert_eq!(classify("business_lead_task.csv"), SourceType::BusinessLead);
    }

    #[test]
    fn priority_order_memory_before_everything() {
        assert_eq!(classify("memory/trading_tasks.md"), SourceType::Memory);
    }

    #[test]
    fn trading_variants() {
        assert_eq!(classify("PAPER_TRADING.md"), SourceType::PaperTrading);
        assert_eq!(classify("crypto/trading-log.csv"), SourceType::PaperTrading);
    }

    #[test]
    fn task_calendar_agent() {
        assert_eq!(classify("TODO.md"), SourceType::Task);
        assert_eq!(classify("projects/tasks.json"), SourceType::Task);
        assert_eq!(classify("calendar/week.md"), SourceType::Calendar);
        assert_eq!(classify("schedule.txt"), SourceType::Calendar);
        assert_eq!(classify("AGENTS.md"), SourceType::AgentConfig);
        assert_eq!(classify("SOUL.md"), SourceType::AgentConfig);
        assert_eq!(classify("USER.md"), SourceType::AgentConfig);
    }

    #[test]
    fn task_before_calendar() {
        assert_eq!(classify("scheduled_tasks.json"), SourceType::Task);
    }

    #[test]
    fn default_is_workspace() {
        assert_eq!(classify("README.md"), SourceType::Workspace);
        assert_eq!(classify(""), SourceType::Workspace);
    }
}
