// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    // Re-run build script if git HEAD changes
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");

    // Packagers can pin the version string instead of relying on git
    let version = if let Ok(v) = std::env::var("BOARD_CAMERA_VERSION") {
        v
    } else {
        git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// "0.1.0-abcdef1" at a tag, "0.1.0-dirty-abcdef1" after it
fn git_version() -> Option<String> {
    let described = run_git(&["describe", "--tags", "--always", "--match", "v*"])?;
    let described = described.strip_prefix('v').unwrap_or(&described).to_string();

    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    if parts.len() >= 3 {
        let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
        return Some(format!("{}-dirty-{}", parts[2], hash));
    }

    let hash = run_git(&["rev-parse", "--short", "HEAD"])?;
    if described == hash {
        Some(format!("{}-{}", env!("CARGO_PKG_VERSION"), hash))
    } else {
        Some(format!("{}-{}", described, hash))
    }
}

fn run_git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}
