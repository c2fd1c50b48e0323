// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    // Re-run build script if git HEAD changes
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=CAMERA_IDENTIFY_VERSION");

    // Packagers can pin the version string
    let version = match std::env::var("CAMERA_IDENTIFY_VERSION") {
        Ok(v) => v,
        Err(_) => describe_version(),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `git describe` output without the leading `v`, falling back to the crate version
fn describe_version() -> String {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--match", "v*"])
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let described = String::from_utf8_lossy(&output.stdout).trim().to_string();
            described
                .strip_prefix('v')
                .map(str::to_string)
                .unwrap_or(described)
        }
        _ => std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string()),
    }
}
