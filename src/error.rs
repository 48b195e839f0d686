//! Error types for devlock
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Duration string errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    /// Not a duration at all
    #[error("invalid duration \"{input}\"")]
    Invalid { input: String },

    /// Number without a unit suffix
    #[error("missing unit in duration \"{input}\"")]
    MissingUnit { input: String },

    /// Unit suffix not recognized
    #[error("unknown unit \"{unit}\" in duration \"{input}\"")]
    UnknownUnit { unit: String, input: String },

    /// Negative durations cannot express a TTL
    #[error("negative duration \"{input}\" is not allowed")]
    Negative { input: String },

    /// Larger than the representable range
    #[error("duration \"{input}\" is out of range")]
    Overflow { input: String },
}

/// Flake reference parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlakeRefError {
    /// Empty reference string
    #[error("flake reference is empty")]
    Empty,

    /// Scheme not understood
    #[error("unsupported flake reference scheme '{scheme}' in '{reference}'")]
    UnsupportedScheme { scheme: String, reference: String },

    /// Structurally invalid reference
    #[error("invalid flake reference '{reference}': {reason}")]
    Invalid { reference: String, reason: String },
}

/// Errors reported by external package resolvers
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No resolver is available for this kind of package
    #[error("cannot resolve '{package}' without a package resolver")]
    Unavailable { package: String },

    /// The resolver ran and failed
    #[error("failed to resolve '{package}': {error}")]
    Failed { package: String, error: String },

    /// Malformed RunX package reference
    #[error("invalid runx package '{package}': {reason}")]
    InvalidRunxRef { package: String, reason: String },

    /// Malformed flake reference
    #[error(transparent)]
    FlakeRef(#[from] FlakeRefError),
}

/// Project configuration errors
#[derive(Error, Debug)]
pub enum ProjectError {
    /// Config file missing
    #[error("No devbox.json found at '{path}'")]
    ConfigNotFound { path: PathBuf },

    /// Config file unreadable
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Config file not valid JSON / schema
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Hashing the config failed
    #[error("Failed to hash config: {0}")]
    HashError(String),
}

/// Installation state file errors
#[derive(Error, Debug)]
pub enum StateError {
    /// State or lock file unreadable
    #[error("Failed to read state file '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// State file corrupt
    #[error("Failed to parse state file '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// State file could not be written
    #[error("Failed to write state file '{path}': {error}")]
    WriteError { path: PathBuf, error: String },
}

/// Lock store errors
#[derive(Error, Debug)]
pub enum LockError {
    /// Lock file exists but cannot be read
    #[error("Failed to read lock file '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Lock file is not valid
    #[error("Failed to parse lock file '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Lock file could not be written
    #[error("Failed to write lock file '{path}': {error}")]
    WriteError { path: PathBuf, error: String },

    /// Content hash for the dirty check failed
    #[error("Failed to hash lock file contents: {0}")]
    HashError(String),

    /// External resolver failure
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Project context failure
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Staleness state failure
    #[error(transparent)]
    State(#[from] StateError),
}

/// Plugin fetch errors
#[derive(Error, Debug)]
pub enum PluginError {
    /// Malformed TTL override
    #[error("invalid plugin cache TTL override: {0}")]
    InvalidTtl(#[from] DurationError),

    /// Reference cannot be used as a GitHub plugin
    #[error("invalid plugin reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Content URL could not be built
    #[error("invalid plugin URL '{url}': {error}")]
    InvalidUrl { url: String, error: String },

    /// Transport failure
    #[error("Network error fetching '{url}': {error}")]
    Network { url: String, error: String },

    /// Non-success HTTP status
    #[error(
        "failed to get plugin {key} @ {url} (Status code {status}).\n{auth_info}\n\
         Please make sure a plugin.json file exists in plugin directory."
    )]
    ManifestNotFound {
        key: String,
        url: String,
        status: u16,
        auth_info: String,
    },

    /// Manifest is not valid JSON
    #[error("invalid plugin manifest at '{url}': {error}")]
    InvalidManifest { url: String, error: String },
}
