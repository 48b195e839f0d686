//! CLI implementation for `devlock update-stdenv`

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::commands::load_project;
use crate::cli::output::{print_detail, print_success};
use crate::core::lock::LockStore;
use crate::core::project::ProjectContext;
use crate::core::resolver::PinnedRefResolver;

/// Execute the update-stdenv command
pub fn execute(path: &Path) -> Result<()> {
    let project = load_project(path)?;
    let resolver = PinnedRefResolver::new();
    let mut store = LockStore::load(&project, &resolver)?;

    store
        .update_stdenv()
        .context("Failed to update the base nixpkgs reference")?;

    let stdenv = project.stdenv().to_string();
    print_success(&format!("Updated {stdenv}"));
    if let Some(package) = store.get(&stdenv) {
        print_detail(&package.resolved);
    }
    Ok(())
}
