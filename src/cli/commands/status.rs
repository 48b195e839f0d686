//! CLI implementation for `devlock status` and `devlock mark-installed`

use std::path::Path;

use anyhow::Result;
use serde_json::json;

use crate::cli::commands::load_project;
use crate::cli::output::{
    print_detail, print_json, print_success, print_warning, status, OutputConfig,
};
use crate::core::lock::LockStore;
use crate::core::resolver::PinnedRefResolver;

/// Execute the status command
pub fn execute(path: &Path, fish: bool) -> Result<()> {
    let project = load_project(path)?;
    let resolver = PinnedRefResolver::new();
    let store = LockStore::load(&project, &resolver)?;

    let dirty = store.is_dirty()?;
    let up_to_date = store.is_up_to_date_and_installed(fish)?;
    let unresolved = store.unresolved();

    print_json(&json!({
        "up_to_date": up_to_date,
        "lock_file_dirty": dirty,
        "unresolved": unresolved,
        "allow_insecure": store.has_allow_insecure_packages(),
    }))?;

    if up_to_date {
        print_success("Environment is up to date");
    } else {
        print_warning("Environment needs to be reinstalled");
    }
    if !unresolved.is_empty() && OutputConfig::current().show_messages() {
        println!("{} Unresolved packages:", status::INFO);
        for spec in unresolved {
            print_detail(spec);
        }
    }
    Ok(())
}

/// Execute the mark-installed command
pub fn execute_mark_installed(path: &Path, fish: bool) -> Result<()> {
    let project = load_project(path)?;
    let resolver = PinnedRefResolver::new();
    let store = LockStore::load(&project, &resolver)?;

    store.update_installed_state(fish)?;
    print_success("Recorded installation state");
    Ok(())
}
