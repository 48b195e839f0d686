//! Configuration and constants
//!
//! - [`defaults`] - File names, format versions, and default values
//! - [`urls`] - Remote endpoints and default flake references
//! - [`env`] - Environment variable names
//! - [`duration`] - Go-style duration strings (`1h30m`, `500ms`)

pub mod defaults;
pub mod duration;
pub mod env;
pub mod urls;
