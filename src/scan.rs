//! Workspace scanner.
//!
//! Walks the configured workspace root and produces a [`FileEntry`] for
//! every file whose extension is on the allow-list. Hidden entries (names
//! starting with `.`) and build/dependency directories are pruned before
//! descending, so large `node_modules` trees are never walked.
//!
//! An unreadable directory or file is logged and skipped; the scan itself
//! only fails when the root is missing.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

use workspace_index_core::chunk::truncate_chars;
use workspace_index_core::classify::classify;
use workspace_index_core::models::{FileEntry, SourceType};
use workspace_index_core::CoreError;

use crate::config::WorkspaceConfig;

/// Characters of file content included in a [`FileSummary`].
pub const PREVIEW_CHARS: usize = 200;

/// What to include and what to prune while walking.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lowercase extensions without the dot.
    pub extensions: Vec<String>,
    /// Directory names pruned in addition to dot-entries.
    pub skip_dirs: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: ["md", "csv", "txt", "json"].map(String::from).to_vec(),
            skip_dirs: ["node_modules", "dist", "build", "target"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl From<&WorkspaceConfig> for ScanOptions {
    fn from(ws: &WorkspaceConfig) -> Self {
        Self {
            extensions: ws.extensions.clone(),
            skip_dirs: ws.skip_dirs.clone(),
        }
    }
}

impl ScanOptions {
    fn is_pruned(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        entry.file_type().is_dir() && self.skip_dirs.iter().any(|d| d.as_str() == name)
    }

    fn extension_of(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        self.extensions.contains(&ext).then_some(ext)
    }
}

/// Recursively list indexable files under `root`, sorted by relative path.
pub fn scan_workspace(root: &Path, options: &ScanOptions) -> Result<Vec<FileEntry>> {
    if !root.is_dir() {
        bail!("Workspace root does not exist: {}", root.display());
    }

    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !options.is_pruned(e));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable workspace entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(file_type) = options.extension_of(path) else {
            continue;
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot stat file");
                continue;
            }
        };

        let relative = path.strip_prefix(root).unwrap_or(path);
        entries.push(FileEntry {
            path: to_slash_path(relative),
            name: entry.file_name().to_string_lossy().to_string(),
            file_type,
            size: metadata.len(),
            modified: metadata.modified().map(system_time_ms).unwrap_or(0),
        });
    }

    // Sort for deterministic ordering
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::debug!(root = %root.display(), files = entries.len(), "workspace scanned");
    Ok(entries)
}

fn to_slash_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Milliseconds since the Unix epoch; pre-epoch times clamp to 0.
pub fn system_time_ms(t: SystemTime) -> i64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Join a caller-supplied relative path onto `root`, refusing anything that
/// could escape it lexically. Hidden entries are refused too, matching what
/// the scanner lists.
pub fn resolve_relative(root: &Path, relative: &str) -> Result<PathBuf, CoreError> {
    let rel = Path::new(relative.trim());
    if relative.trim().is_empty() {
        return Err(CoreError::validation("path must not be empty"));
    }
    for component in rel.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(name) if !name.to_string_lossy().starts_with('.') => {}
            Component::Normal(_) => {
                return Err(CoreError::validation(format!(
                    "hidden paths are not readable: '{}'",
                    relative
                )))
            }
            _ => {
                return Err(CoreError::validation(format!(
                    "path must be relative to the workspace root: '{}'",
                    relative
                )))
            }
        }
    }
    Ok(root.join(rel))
}

/// Read a workspace file as UTF-8.
///
/// The resolved path is canonicalized, so a symlink inside the workspace
/// that points outside of it is refused.
pub fn read_workspace_file(root: &Path, relative: &str) -> Result<String> {
    let path = resolve_relative(root, relative)?;
    if !path.is_file() {
        return Err(CoreError::not_found(format!("file '{}'", relative)).into());
    }

    let canonical_root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve workspace root: {}", root.display()))?;
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve workspace file: {}", path.display()))?;
    if !canonical.starts_with(&canonical_root) {
        return Err(CoreError::validation(format!(
            "path resolves outside the workspace root: '{}'",
            relative
        ))
        .into());
    }

    std::fs::read_to_string(&canonical)
        .with_context(|| format!("Failed to read workspace file: {}", path.display()))
}

/// Dashboard card for one scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub source_type: SourceType,
    pub size: u64,
    pub line_count: usize,
    pub preview: String,
}

/// Read `entry` and build its summary card.
pub fn summarize_file(root: &Path, entry: &FileEntry) -> Result<FileSummary> {
    let content = read_workspace_file(root, &entry.path)?;
    Ok(FileSummary {
        path: entry.path.clone(),
        name: entry.name.clone(),
        file_type: entry.file_type.clone(),
        source_type: classify(&entry.path),
        size: entry.size,
        line_count: content.lines().count(),
        preview: truncate_chars(&content, PREVIEW_CHARS).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("memory")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("sub/target")).unwrap();
        fs::write(root.join("MEMORY.md"), "# A\nhello\n").unwrap();
        fs::write(root.join("memory/day.md"), "notes").unwrap();
        fs::write(root.join("leads.CSV"), "a,b").unwrap();
        fs::write(root.join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(root.join(".hidden.md"), "secret").unwrap();
        fs::write(root.join("node_modules/pkg/readme.md"), "dep").unwrap();
        fs::write(root.join(".git/config.txt"), "git").unwrap();
        fs::write(root.join("sub/target/out.json"), "{}").unwrap();
        fs::write(root.join("sub/data.json"), "{}").unwrap();
        tmp
    }

    #[test]
    fn scan_applies_allow_list_and_pruning() {
        let tmp = workspace();
        let entries = scan_workspace(tmp.path(), &ScanOptions::default()).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["MEMORY.md", "leads.CSV", "memory/day.md", "sub/data.json"]);

        let csv = &entries[1];
        assert_eq!(csv.file_type, "csv");
        assert_eq!(csv.name, "leads.CSV");
        assert_eq!(csv.size, 3);
        assert!(csv.modified > 0);
    }

    #[test]
    fn scan_respects_configured_options() {
        let tmp = workspace();
        let options = ScanOptions {
            extensions: vec!["json".into()],
            skip_dirs: vec![],
        };
        let entries = scan_workspace(tmp.path(), &options).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["sub/data.json", "sub/target/out.json"]);
    }

    #[test]
    fn scan_missing_root_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_workspace(&tmp.path().join("nope"), &ScanOptions::default()).is_err());
    }

    #[test]
    fn summarize_builds_preview() {
        let tmp = workspace();
        let long = format!("{}\nsecond line\n", "x".repeat(300));
        fs::write(tmp.path().join("tasks.txt"), &long).unwrap();
        let entries = scan_workspace(tmp.path(), &ScanOptions::default()).unwrap();
        let entry = entries.iter().find(|e| e.path == "tasks.txt").unwrap();

        let summary = summarize_file(tmp.path(), entry).unwrap();
        assert_eq!(summary.source_type, SourceType::Task);
        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.preview.chars().count(), PREVIEW_CHARS);

        let v = serde_json::to_value(&summary).unwrap();
        assert_eq!(v["type"], "txt");
        assert_eq!(v["lineCount"], 2);
        assert_eq!(v["sourceType"], "task");
    }

    #[test]
    fn read_rejects_traversal() {
        let tmp = workspace();
        assert_eq!(read_workspace_file(tmp.path(), "MEMORY.md").unwrap(), "# A\nhello\n");
        assert_eq!(read_workspace_file(tmp.path(), "./memory/day.md").unwrap(), "notes");

        for bad in ["../etc/passwd", "/etc/passwd", "memory/../../x", ""] {
            let err = read_workspace_file(tmp.path(), bad).unwrap_err();
            assert!(
                matches!(err.downcast_ref::<CoreError>(), Some(CoreError::Validation(_))),
                "{} should be rejected",
                bad
            );
        }

        let err = read_workspace_file(tmp.path(), "missing.md").unwrap_err();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::NotFound(_))));
    }

    #[test]
    fn read_rejects_hidden_entries() {
        let tmp = workspace();
        for hidden in [".hidden.md", ".git/config.txt"] {
            let err = read_workspace_file(tmp.path(), hidden).unwrap_err();
            assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::Validation(_))));
        }
    }

    #[cfg(unix)]
    #[test]
    fn read_refuses_symlink_leaving_workspace() {
        let tmp = workspace();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "TOP SECRET").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            tmp.path().join("notes.md"),
        )
        .unwrap();

        let err = read_workspace_file(tmp.path(), "notes.md").unwrap_err();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::Validation(_))));

        // links that stay inside the workspace still resolve
        std::os::unix::fs::symlink(tmp.path().join("MEMORY.md"), tmp.path().join("alias.md"))
            .unwrap();
        assert_eq!(read_workspace_file(tmp.path(), "alias.md").unwrap(), "# A\nhello\n");
    }
}
