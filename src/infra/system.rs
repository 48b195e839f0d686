//! Host system detection

use std::env::consts;

/// Nix system double of the running host, e.g. `x86_64-linux` or `aarch64-darwin`
pub fn current_system() -> String {
    let arch = match consts::ARCH {
        "x86" => "i686",
        "powerpc64" => "powerpc64le",
        other => other,
    };
    let os = match consts::OS {
        "macos" => "darwin",
        other => other,
    };
    format!("{arch}-{os}")
}
