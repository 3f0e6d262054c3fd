//! Build script for dyfi-fetch
//!
//! Stamps the binary with the commit it was built from and the build time,
//! both shown in the startup log line. Source archives without a `.git`
//! directory can pass the commit in `DYFI_GIT_HASH`.

use std::path::Path;
use std::process::Command;

const GIT_HASH_ENV: &str = "DYFI_GIT_HASH";

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed={}", GIT_HASH_ENV);
    // Workspace root holds the repository; rebuild when HEAD moves
    let head = Path::new("..").join(".git").join("HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    let git_hash = std::env::var(GIT_HASH_ENV)
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(git_short_hash)
        .unwrap_or_else(|| "unknown".to_string());

    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
}
