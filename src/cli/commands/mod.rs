//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod add;
pub mod list;
pub mod plugin;
pub mod remove;
pub mod status;
pub mod tidy;
pub mod update;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::core::project::Project;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve packages and record them in devbox.lock
    Add {
        /// Package specs (`python@3.12`, `hello`, `github:owner/repo#attr`, `runx:owner/repo`)
        #[arg(required = true)]
        specs: Vec<String>,
    },

    /// Remove packages from devbox.lock
    #[command(name = "rm", alias = "remove")]
    Remove {
        /// Package specs to remove
        #[arg(required = true)]
        specs: Vec<String>,
    },

    /// Drop lock entries the project no longer declares
    Tidy,

    /// List locked packages
    List,

    /// Check whether the installed environment is up to date
    Status {
        /// Check the fish shell flavor
        #[arg(long)]
        fish: bool,
    },

    /// Record the current lock file as installed
    MarkInstalled {
        /// Record the fish shell flavor
        #[arg(long)]
        fish: bool,
    },

    /// Re-resolve the base nixpkgs reference
    UpdateStdenv,

    /// Fetch a GitHub-hosted plugin manifest
    Plugin {
        /// Plugin reference, e.g. `github:jetify-com/devbox-plugins?dir=mongodb`
        reference: String,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self, project_dir: &Path) -> Result<()> {
        match self {
            Self::Add { specs } => add::execute(project_dir, &specs),
            Self::Remove { specs } => remove::execute(project_dir, &specs),
            Self::Tidy => tidy::execute(project_dir),
            Self::List => list::execute(project_dir),
            Self::Status { fish } => status::execute(project_dir, fish),
            Self::MarkInstalled { fish } => status::execute_mark_installed(project_dir, fish),
            Self::UpdateStdenv => update::execute(project_dir),
            Self::Plugin { reference } => plugin::execute(&reference).await,
        }
    }
}

/// Load the project in `path`
pub(crate) fn load_project(path: &Path) -> Result<Project> {
    Project::load(path).with_context(|| {
        format!(
            "No usable devbox.json in {}. Create one before locking packages.",
            path.display()
        )
    })
}
