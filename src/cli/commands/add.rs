//! CLI implementation for `devlock add`

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::commands::load_project;
use crate::cli::output::{print_detail, print_json, print_success, print_warning};
use crate::core::lock::LockStore;
use crate::core::resolver::PinnedRefResolver;

/// Execute the add command
pub fn execute(path: &Path, specs: &[String]) -> Result<()> {
    let project = load_project(path)?;
    let resolver = PinnedRefResolver::new();
    let mut store = LockStore::load(&project, &resolver)?;

    store
        .add(specs)
        .with_context(|| format!("Failed to lock {}", specs.join(", ")))?;

    let mut locked = serde_json::Map::new();
    for spec in specs {
        match store.get(spec) {
            Some(package) => {
                print_success(&format!("Locked {spec}"));
                print_detail(&package.resolved);
                locked.insert(spec.clone(), package.resolved.clone().into());
            }
            None => {
                print_warning(&format!("{spec} could not be resolved offline"));
                locked.insert(spec.clone(), serde_json::Value::Null);
            }
        }
    }
    print_json(&serde_json::Value::Object(locked))
}
