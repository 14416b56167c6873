use chrono::Utc;
use std::process::Command;

/// Short commit hash, or `None` outside a git checkout.
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// True when tracked files differ from HEAD.
fn worktree_dirty() -> bool {
    Command::new("git")
        .args(["diff", "--quiet", "HEAD"])
        .status()
        .map(|s| !s.success())
        .unwrap_or(false)
}

fn main() {
    let hash = git_short_hash().unwrap_or_else(|| "unknown".to_string());
    let build_hash = if worktree_dirty() {
        format!("{hash}-dirty-{}", Utc::now().format("%Y%m%d-%H%M%S"))
    } else {
        hash
    };
    println!("cargo:rustc-env=BUILD_HASH={build_hash}");

    // Workspace root is two levels up
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");
}
