//! CLI implementation for `devlock tidy`

use std::path::Path;

use anyhow::Result;

use crate::cli::commands::load_project;
use crate::cli::output::{print_detail, print_success};
use crate::core::lock::LockStore;
use crate::core::resolver::PinnedRefResolver;

/// Execute the tidy command
pub fn execute(path: &Path) -> Result<()> {
    let project = load_project(path)?;
    let resolver = PinnedRefResolver::new();
    let mut store = LockStore::load(&project, &resolver)?;

    let before: Vec<String> = store.lock_file().packages.keys().cloned().collect();
    store.tidy();
    store.save()?;

    let removed: Vec<&String> = before
        .iter()
        .filter(|spec| !store.lock_file().packages.contains_key(*spec))
        .collect();
    if removed.is_empty() {
        print_success("Lock file is tidy");
    } else {
        print_success(&format!("Removed {} unused entries", removed.len()));
        for spec in removed {
            print_detail(&format!("- {spec}"));
        }
    }
    Ok(())
}
