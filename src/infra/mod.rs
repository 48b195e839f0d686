//! Infrastructure layer
//!
//! Filesystem access, platform directories, and host detection.

pub mod dirs;
pub mod filesystem;
pub mod system;
