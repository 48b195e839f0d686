//! CLI implementation for `devlock plugin`

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::output::{create_spinner, print_detail, print_json, print_success};
use crate::core::flake::FlakeRef;
use crate::infra::dirs::DevlockDirs;
use crate::plugin::{ContentCache, GithubPluginSource, GithubSettings};

/// Execute the plugin command
pub async fn execute(reference: &str) -> Result<()> {
    let reference = FlakeRef::parse(reference)
        .with_context(|| format!("Invalid plugin reference '{reference}'"))?;

    let cache = Arc::new(ContentCache::with_dir(DevlockDirs::new().plugin_cache_dir()));
    let source = GithubPluginSource::new(cache, GithubSettings::from_env());

    let spinner = create_spinner(&format!("Fetching {reference}"));
    let plugin = source.load(reference).await;
    spinner.finish_and_clear();
    let plugin = plugin?;

    print_success(&format!("Loaded plugin {}", plugin.canonical_name()));
    print_detail(&format!("key:  {}", plugin.lockfile_key()));
    print_detail(&format!("hash: {}", plugin.hash()));
    print_json(&json!({
        "name": plugin.canonical_name(),
        "key": plugin.lockfile_key(),
        "hash": plugin.hash(),
    }))
}
