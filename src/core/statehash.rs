//! Installation state tracking
//!
//! After an environment is installed, a small state file records what it was
//! installed from. Comparing that record against the current project tells
//! whether a reinstall is needed without touching the package store.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::defaults::{LOCK_FILE_NAME, STATE_DIR, STATE_FILE_NAME};
use crate::core::cachehash;
use crate::error::StateError;
use crate::infra::filesystem;

/// Inputs that identify an installed environment
#[derive(Debug, Clone)]
pub struct StateHashArgs<'a> {
    pub project_dir: &'a Path,
    pub config_hash: String,
    pub is_fish: bool,
}

/// Recorded installation state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    pub config_hash: String,
    pub is_fish: bool,
    pub lock_file_hash: String,
    pub tool_version: String,
}

impl LocalState {
    /// State the project would have if installed right now
    pub fn current(args: &StateHashArgs<'_>) -> Result<Self, StateError> {
        Ok(Self {
            config_hash: args.config_hash.clone(),
            is_fish: args.is_fish,
            lock_file_hash: lock_file_hash(args.project_dir)?,
            tool_version: tool_version(),
        })
    }
}

/// Path of the state file for `project_dir`
pub fn state_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR).join(STATE_FILE_NAME)
}

/// Whether the recorded state matches the current one.
///
/// A missing state file means nothing was installed yet.
pub fn is_state_up_to_date(args: &StateHashArgs<'_>) -> Result<bool, StateError> {
    let Some(recorded) = read_state(args.project_dir)? else {
        tracing::debug!("No installation state recorded");
        return Ok(false);
    };
    let current = LocalState::current(args)?;
    if recorded != current {
        tracing::debug!("Installation state is stale");
    }
    Ok(recorded == current)
}

/// Record the current state as installed
pub fn update_state_hash_file(args: &StateHashArgs<'_>) -> Result<(), StateError> {
    let state = LocalState::current(args)?;
    let path = state_file_path(args.project_dir);
    let mut content = serde_json::to_string_pretty(&state).map_err(|e| StateError::WriteError {
        path: path.clone(),
        error: e.to_string(),
    })?;
    content.push('\n');
    filesystem::write_atomic(&path, content.as_bytes()).map_err(|e| StateError::WriteError {
        path: path.clone(),
        error: e.to_string(),
    })?;
    tracing::debug!("Recorded installation state in {}", path.display());
    Ok(())
}

fn read_state(project_dir: &Path) -> Result<Option<LocalState>, StateError> {
    let path = state_file_path(project_dir);
    let content = filesystem::read_if_exists(&path).map_err(|e| StateError::ReadError {
        path: path.clone(),
        error: e.to_string(),
    })?;
    content
        .map(|content| {
            serde_json::from_slice(&content).map_err(|e| StateError::ParseError {
                path: path.clone(),
                error: e.to_string(),
            })
        })
        .transpose()
}

fn lock_file_hash(project_dir: &Path) -> Result<String, StateError> {
    let path = project_dir.join(LOCK_FILE_NAME);
    let content = filesystem::read_if_exists(&path).map_err(|e| StateError::ReadError {
        path: path.clone(),
        error: e.to_string(),
    })?;
    Ok(content.map(|c| cachehash::bytes(&c)).unwrap_or_default())
}

fn tool_version() -> String {
    match option_env!("VERGEN_GIT_SHA") {
        Some(sha) => format!("{}+{sha}", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_string(),
    }
}
