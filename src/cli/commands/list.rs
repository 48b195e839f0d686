//! CLI implementation for `devlock list`

use std::path::Path;

use anyhow::Result;

use crate::cli::commands::load_project;
use crate::cli::output::{print_json, OutputConfig};
use crate::core::lock::LockStore;
use crate::core::resolver::PinnedRefResolver;

/// Execute the list command
pub fn execute(path: &Path) -> Result<()> {
    let project = load_project(path)?;
    let resolver = PinnedRefResolver::new();
    let store = LockStore::load(&project, &resolver)?;
    let lock_file = store.lock_file();

    if OutputConfig::current().json {
        return print_json(&serde_json::to_value(lock_file)?);
    }
    if !OutputConfig::current().show_messages() {
        return Ok(());
    }

    if lock_file.packages.is_empty() {
        println!("No packages locked");
        return Ok(());
    }
    for (spec, package) in &lock_file.packages {
        if package.is_resolved() {
            println!("{spec}");
            println!("  {}", package.resolved);
        } else {
            println!("{spec} (unresolved)");
        }
    }
    Ok(())
}
