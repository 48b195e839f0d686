//! Environment variable names

/// Optional token sent as `Authorization: token <value>` on plugin fetches
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

/// Overrides the plugin cache TTL (Go duration syntax, e.g. `1h`)
pub const PLUGIN_CACHE_TTL: &str = "DEVBOX_X_GITHUB_PLUGIN_CACHE_TTL";

/// Overrides the on-disk cache directory
pub const CACHE_DIR: &str = "DEVLOCK_CACHE_DIR";
