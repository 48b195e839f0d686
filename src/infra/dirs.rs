//! Platform-specific directory management
//!
//! Provides the user cache directory used for fetched plugin content.
//! Follows XDG Base Directory Specification on Linux and standard locations on macOS.
//!
//! `DEVLOCK_CACHE_DIR` overrides the default location.

use std::env;
use std::path::PathBuf;

use crate::config::env::CACHE_DIR;

/// Application name used in directory paths
const APP_NAME: &str = "devlock";

/// Subdirectory for cached GitHub plugin content
const PLUGIN_CACHE_SUBDIR: &str = "plugin/github";

/// Platform-specific directory provider for devlock
#[derive(Debug, Clone)]
pub struct DevlockDirs {
    cache_dir: PathBuf,
}

impl DevlockDirs {
    /// Create a new `DevlockDirs` instance
    ///
    /// Checks the environment first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_dir: Self::resolve_cache_dir(),
        }
    }

    /// Use `cache_dir` instead of the platform default
    #[must_use]
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Get the cache directory path
    ///
    /// - Linux: `$XDG_CACHE_HOME/devlock` or `~/.cache/devlock`
    /// - macOS: `~/Library/Caches/devlock`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    /// Directory holding cached plugin manifests
    #[must_use]
    pub fn plugin_cache_dir(&self) -> PathBuf {
        self.cache_dir.join(PLUGIN_CACHE_SUBDIR)
    }

    fn resolve_cache_dir() -> PathBuf {
        if let Ok(path) = env::var(CACHE_DIR) {
            return PathBuf::from(path);
        }

        dirs::cache_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".cache").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".cache").join(APP_NAME))
            })
    }
}

impl Default for DevlockDirs {
    fn default() -> Self {
        Self::new()
    }
}
