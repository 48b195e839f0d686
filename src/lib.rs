//! devlock - reproducible package locking for development environments
//!
//! Resolves the package specs a project declares into immutable install
//! references, persists them in a project-local lock file, and tracks whether
//! an installed environment is stale. Plugins hosted on GitHub are fetched
//! through a TTL cache.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Lock file model, package classification, and resolution
//! - [`plugin`] - Remote plugin content and its cache
//! - [`infra`] - Infrastructure layer (filesystem, directories, host system)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod plugin;

#[cfg(test)]
pub mod test_utils;
