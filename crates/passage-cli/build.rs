//! Build script to capture git version information at compile time.

use std::process::Command;

fn main() {
    // Rerun when the checked-out commit or tags change
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    // Outside a git checkout, fall back to the crate version
    let version = git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=PASSAGE_VERSION={}", version);
}

fn git_version() -> Option<String> {
    // Nearest tag plus commit suffix, or a bare hash when untagged
    let output = Command::new("git")
        .args(["describe", "--tags", "--always"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let version = String::from_utf8(output.stdout).ok()?;
    let version = version.trim();

    if version.is_empty() {
        return None;
    }

    // Tags are written as v1.2.3
    let version = version.strip_prefix('v').unwrap_or(version);

    Some(version.to_string())
}
