//! Core locking logic
//!
//! # Submodules
//!
//! - [`flake`] - Flake references and installables
//! - [`pkgtype`] - Package spec classification
//! - [`project`] - Project context and `devbox.json`
//! - [`resolver`] - External resolver capabilities
//! - [`lock`] - Lock file model and lock store
//! - [`statehash`] - Installation state tracking
//! - [`cachehash`] - Content hashing

pub mod cachehash;
pub mod flake;
pub mod lock;
pub mod pkgtype;
pub mod project;
pub mod resolver;
pub mod statehash;
