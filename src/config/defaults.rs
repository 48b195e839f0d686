//! Default configuration values

use std::time::Duration;

/// Lock file name, relative to the project directory
pub const LOCK_FILE_NAME: &str = "devbox.lock";

/// Lock file format version written by this crate
pub const LOCK_FILE_VERSION: &str = "1";

/// Project configuration file name
pub const CONFIG_FILE_NAME: &str = "devbox.json";

/// Project-local state directory
pub const STATE_DIR: &str = ".devbox";

/// Installation state file, inside [`STATE_DIR`]
pub const STATE_FILE_NAME: &str = "local.lock";

/// Plugin manifest file name
pub const PLUGIN_CONFIG_NAME: &str = "plugin.json";

/// How long fetched plugin content stays cached
pub const PLUGIN_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Branch used when a plugin reference names neither a rev nor a ref.
///
/// GitHub redirects `master` to `main` for newer repositories but never the
/// other way around.
pub const DEFAULT_BRANCH: &str = "master";

/// Prefix marking a package resolved through the RunX registry
pub const RUNX_PREFIX: &str = "runx:";

/// Name of the default output of a package
pub const DEFAULT_OUTPUT_NAME: &str = "out";

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
