//! Throwaway git repositories for tests.

use std::path::Path;
use std::process::Command;

/// Creates an empty repository on branch `main` with one commit.
pub fn init() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    run(dir.path(), &["init", "--quiet"]);
    run(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    run(dir.path(), &["config", "user.name", "Shipflow Tests"]);
    run(dir.path(), &["config", "user.email", "tests@shipflow.invalid"]);
    run(dir.path(), &["config", "commit.gpgsign", "false"]);
    run(dir.path(), &["commit", "--allow-empty", "--quiet", "-m", "init"]);
    dir
}

/// Runs git in `dir`, panicking on failure.
pub fn run(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
}
