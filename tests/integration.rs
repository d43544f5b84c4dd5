use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn wsi_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("wsi");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let workspace = root.join("workspace");
    fs::create_dir_all(workspace.join("memory")).unwrap();
    fs::create_dir_all(workspace.join("node_modules/dep")).unwrap();
    fs::write(
        workspace.join("MEMORY.md"),
        "# Goals\n\nShip the dashboard before the quarterly review.\n\n# People\n\nAlice owns the revenue forecast.\n",
    )
    .unwrap();
    fs::write(workspace.join("node_modules/dep/README.md"), "# Dep\n\nrevenue").unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/wsi.sqlite"

[workspace]
root = "{root}/workspace"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("wsi.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn workspace_dir(tmp: &TempDir) -> PathBuf {
    tmp.path().join("workspace")
}

fn run_wsi(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = wsi_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run wsi binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_wsi(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/wsi.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_wsi(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_wsi(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_scan_prunes_dependency_dirs() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_wsi(&config_path, &["scan"]);
    assert!(success, "scan failed: {}", stderr);
    assert!(stdout.contains("MEMORY.md"));
    assert!(!stdout.contains("node_modules"));
    assert!(stdout.contains("1 files"));
}

#[test]
fn test_reindex_then_skip_unchanged() {
    let (_tmp, config_path) = setup_test_env();
    run_wsi(&config_path, &["init"]);

    let (stdout, stderr, success) = run_wsi(&config_path, &["reindex"]);
    assert!(success, "reindex failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("indexed: 1"), "{}", stdout);
    assert!(stdout.contains("ok"));

    let (stdout, _, success) = run_wsi(&config_path, &["reindex"]);
    assert!(success);
    assert!(stdout.contains("indexed: 0"), "{}", stdout);
    assert!(stdout.contains("skipped: 1"), "{}", stdout);

    let (stdout, _, success) = run_wsi(&config_path, &["reindex", "--full"]);
    assert!(success);
    assert!(stdout.contains("indexed: 1"), "{}", stdout);
}

#[test]
fn test_reindex_counts_empty_file() {
    let (tmp, config_path) = setup_test_env();
    fs::write(workspace_dir(&tmp).join("NOTES.txt"), "").unwrap();

    let (stdout, stderr, success) = run_wsi(&config_path, &["reindex"]);
    assert!(success, "reindex failed: {}", stderr);
    assert!(stdout.contains("empty    NOTES.txt"), "{}", stdout);
    assert!(stdout.contains("empty: 1"), "{}", stdout);
    assert!(stdout.contains("indexed: 1"), "{}", stdout);
}

#[test]
fn test_reindex_prune_removes_deleted_file() {
    let (tmp, config_path) = setup_test_env();
    let daily = workspace_dir(&tmp).join("memory/2024-05-01.md");
    fs::write(&daily, "# Standup\n\nCalled the supplier about invoices.\n").unwrap();

    let (_, _, success) = run_wsi(&config_path, &["reindex"]);
    assert!(success);

    fs::remove_file(&daily).unwrap();
    let (stdout, _, success) = run_wsi(&config_path, &["reindex"]);
    assert!(success);
    assert!(!stdout.contains("removed"), "{}", stdout);

    let (stdout, _, success) = run_wsi(&config_path, &["reindex", "--prune"]);
    assert!(success);
    assert!(stdout.contains("removed  memory/2024-05-01.md"), "{}", stdout);

    let (stdout, _, _) = run_wsi(&config_path, &["search", "supplier"]);
    assert!(stdout.contains("No results."), "{}", stdout);
}

#[test]
fn test_search_keyword() {
    let (_tmp, config_path) = setup_test_env();
    run_wsi(&config_path, &["reindex"]);

    let (stdout, stderr, success) = run_wsi(&config_path, &["search", "revenue"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("file: MEMORY.md"), "{}", stdout);
    assert!(stdout.contains("memory / "), "{}", stdout);
    assert!(!stdout.contains("node_modules"));
}

#[test]
fn test_search_filters() {
    let (_tmp, config_path) = setup_test_env();
    run_wsi(&config_path, &["reindex"]);

    let (stdout, _, success) = run_wsi(
        &config_path,
        &["search", "revenue", "--source-type", "memory", "--file-type", ".MD"],
    );
    assert!(success);
    assert!(stdout.contains("file: MEMORY.md"), "{}", stdout);

    let (stdout, _, success) =
        run_wsi(&config_path, &["search", "revenue", "--source-type", "task"]);
    assert!(success);
    assert!(stdout.contains("No results."), "{}", stdout);

    let (_, stderr, success) =
        run_wsi(&config_path, &["search", "revenue", "--source-type", "bogus"]);
    assert!(!success);
    assert!(stderr.contains("unknown source type"), "{}", stderr);
}

#[test]
fn test_search_short_query_returns_nothing() {
    let (_tmp, config_path) = setup_test_env();
    run_wsi(&config_path, &["reindex"]);

    let (stdout, _, success) = run_wsi(&config_path, &["search", "a"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_stats_and_files() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_wsi(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Last index:  never"), "{}", stdout);

    run_wsi(&config_path, &["reindex"]);
    let (stdout, _, success) = run_wsi(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Files:       1"), "{}", stdout);
    assert!(stdout.contains("By source type:"));
    assert!(stdout.contains("memory"));

    let (stdout, _, success) = run_wsi(&config_path, &["files"]);
    assert!(success);
    assert!(stdout.contains("MEMORY.md"));
}

#[test]
fn test_clear_file() {
    let (_tmp, config_path) = setup_test_env();
    run_wsi(&config_path, &["reindex"]);

    let (stdout, _, success) = run_wsi(&config_path, &["clear", "MEMORY.md"]);
    assert!(success);
    assert!(stdout.contains("cleared MEMORY.md"), "{}", stdout);

    let (stdout, _, _) = run_wsi(&config_path, &["files"]);
    assert!(stdout.contains("Index is empty."), "{}", stdout);

    // cleared files are stale again
    let (stdout, _, _) = run_wsi(&config_path, &["reindex"]);
    assert!(stdout.contains("indexed: 1"), "{}", stdout);
}

#[test]
fn test_activity_log_and_list() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_wsi(
        &config_path,
        &[
            "activity",
            "log",
            "--action-type",
            "file_write",
            "--description",
            "Updated MEMORY.md",
            "--file-path",
            "MEMORY.md",
        ],
    );
    assert!(success, "log failed: {}", stderr);
    assert!(stdout.starts_with("logged "));

    let (_, _, success) = run_wsi(
        &config_path,
        &[
            "activity",
            "log",
            "--action-type",
            "search",
            "--description",
            "Looked up leads",
            "--status",
            "failed",
            "--error",
            "timeout",
        ],
    );
    assert!(success);

    let (stdout, _, success) = run_wsi(&config_path, &["activity", "list"]);
    assert!(success);
    let search_pos = stdout.find("Looked up leads").unwrap();
    let write_pos = stdout.find("Updated MEMORY.md").unwrap();
    assert!(search_pos < write_pos, "newest first: {}", stdout);
    assert!(stdout.contains("error: timeout"));

    let (stdout, _, _) = run_wsi(
        &config_path,
        &["activity", "list", "--action-type", "file_write"],
    );
    assert!(stdout.contains("Updated MEMORY.md"));
    assert!(!stdout.contains("Looked up leads"));

    let (stdout, _, success) = run_wsi(&config_path, &["activity", "stats"]);
    assert!(success);
    assert!(stdout.contains("total:   2"), "{}", stdout);
    assert!(stdout.contains("failed:  1"), "{}", stdout);
}

#[test]
fn test_activity_log_rejects_bad_status() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_wsi(
        &config_path,
        &[
            "activity",
            "log",
            "--action-type",
            "x",
            "--description",
            "y",
            "--status",
            "exploded",
        ],
    );
    assert!(!success);
    assert!(stderr.contains("unknown activity status"), "{}", stderr);
}

#[test]
fn test_activity_range_rejects_inverted_bounds() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_wsi(
        &config_path,
        &["activity", "range", "--start", "200", "--end", "100"],
    );
    assert!(!success);
    assert!(stderr.contains("start"), "{}", stderr);
}

#[test]
fn test_relative_workspace_root_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("wsi.toml");
    fs::write(
        &config_path,
        "[db]\npath = \"./x.sqlite\"\n\n[workspace]\nroot = \"relative/dir\"\n",
    )
    .unwrap();

    let (_, stderr, success) = run_wsi(&config_path, &["scan"]);
    assert!(!success);
    assert!(stderr.contains("absolute"), "{}", stderr);
}
