//! CLI implementation for `devlock rm`

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::commands::load_project;
use crate::cli::output::print_success;
use crate::core::lock::LockStore;
use crate::core::resolver::PinnedRefResolver;

/// Execute the remove command
pub fn execute(path: &Path, specs: &[String]) -> Result<()> {
    let project = load_project(path)?;
    let resolver = PinnedRefResolver::new();
    let mut store = LockStore::load(&project, &resolver)?;

    store
        .remove(specs)
        .with_context(|| format!("Failed to remove {}", specs.join(", ")))?;

    for spec in specs {
        print_success(&format!("Removed {spec}"));
    }
    Ok(())
}
