use std::env;
use std::path::Path;
use std::process::Command;

/// Stamp `AGENT_EN_PLACE_VERSION`.
///
/// Release builds use the package version. Debug builds append the git
/// revision (`0.4.0-dev+1a2b3c4d[.dirty]`), or plain `-dev` outside a checkout
/// such as a crates.io tarball.
fn main() {
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let release = env::var("PROFILE").map(|p| p == "release").unwrap_or(false);
    let in_checkout = Path::new(".git").exists();

    let full_version = match (release, in_checkout.then(git_revision).flatten()) {
        (true, _) => version,
        (false, Some(revision)) => format!("{}-dev+{}", version, revision),
        (false, None) => format!("{}-dev", version),
    };

    println!("cargo:rustc-env=AGENT_EN_PLACE_VERSION={}", full_version);

    // A missing path would make cargo rerun this script on every build
    if in_checkout {
        println!("cargo:rerun-if-changed=.git/HEAD");
        println!("cargo:rerun-if-changed=.git/index");
    } else {
        println!("cargo:rerun-if-changed=build.rs");
    }
}

/// Short hash of HEAD, suffixed `.dirty` when tracked files changed
fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();

    let dirty = Command::new("git")
        .args(["status", "--porcelain", "--untracked-files=no"])
        .output()
        .map(|out| out.status.success() && !out.stdout.is_empty())
        .unwrap_or(false);

    Some(if dirty { format!("{}.dirty", hash) } else { hash })
}
