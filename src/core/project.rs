//! Project context
//!
//! The lock store needs four facts about the project it locks for. They are
//! expressed as the [`ProjectContext`] capability so the store can be driven
//! by any project model; [`Project`] is the implementation backed by a
//! `devbox.json` file.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::defaults::CONFIG_FILE_NAME;
use crate::config::urls::{NIXPKGS_DEFAULT_BRANCH, NIXPKGS_OWNER, NIXPKGS_REPO};
use crate::core::cachehash;
use crate::core::flake::FlakeRef;
use crate::error::ProjectError;

/// What the lock store needs to know about a project
pub trait ProjectContext {
    /// Directory holding the config and lock files
    fn project_dir(&self) -> &Path;

    /// Unlocked reference of the base environment (nixpkgs)
    fn stdenv(&self) -> FlakeRef;

    /// Hash of the declared configuration
    fn config_hash(&self) -> Result<String, ProjectError>;

    /// Declared package specs plus trigger packages kept for compatibility
    fn all_package_names_including_removed_trigger_packages(&self) -> Vec<String>;
}

/// Parsed `devbox.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Declared packages
    #[serde(default, skip_serializing_if = "Packages::is_empty")]
    pub packages: Packages,

    /// Pinned nixpkgs for the base environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nixpkgs: Option<NixpkgsConfig>,

    /// Included plugins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

/// Packages as a list of specs or a map of name to version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Packages {
    List(Vec<String>),
    Map(BTreeMap<String, PackageConfig>),
}

/// Map-form package entry: a version string or an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageConfig {
    Version(String),
    Detailed {
        #[serde(default)]
        version: String,
    },
}

/// `nixpkgs` section of the config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NixpkgsConfig {
    #[serde(default)]
    pub commit: String,
}

impl Default for Packages {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl Packages {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(specs) => specs.is_empty(),
            Self::Map(entries) => entries.is_empty(),
        }
    }

    /// Specs as they appear as lock file keys
    pub fn specs(&self) -> Vec<String> {
        match self {
            Self::List(specs) => specs.clone(),
            Self::Map(entries) => entries
                .iter()
                .map(|(name, config)| {
                    let version = match config {
                        PackageConfig::Version(version) => version,
                        PackageConfig::Detailed { version } => version,
                    };
                    if version.is_empty() {
                        name.clone()
                    } else {
                        format!("{name}@{version}")
                    }
                })
                .collect(),
        }
    }
}

impl ProjectConfig {
    /// Parse from a JSON string
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Unlocked base environment reference
    pub fn stdenv(&self) -> FlakeRef {
        let nixpkgs = FlakeRef::github(NIXPKGS_OWNER, NIXPKGS_REPO);
        match &self.nixpkgs {
            Some(config) if !config.commit.is_empty() => {
                nixpkgs.with_ref_or_rev(config.commit.clone())
            }
            _ => nixpkgs.with_ref(NIXPKGS_DEFAULT_BRANCH),
        }
    }
}

/// A project rooted at a directory containing `devbox.json`
#[derive(Debug, Clone)]
pub struct Project {
    dir: PathBuf,
    config: ProjectConfig,
    trigger_packages: Vec<String>,
}

impl Project {
    /// Create a project from an already parsed config
    pub fn new(dir: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
            trigger_packages: Vec::new(),
        }
    }

    /// Load `devbox.json` from `dir`
    pub fn load(dir: &Path) -> Result<Self, ProjectError> {
        let path = Self::config_path(dir);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ProjectError::ConfigNotFound { path })
            }
            Err(e) => {
                return Err(ProjectError::ReadError {
                    path,
                    error: e.to_string(),
                })
            }
        };
        let config = ProjectConfig::from_json(&content).map_err(|e| ProjectError::ParseError {
            path: path.clone(),
            error: e.to_string(),
        })?;
        tracing::debug!("Loaded project config from {}", path.display());
        Ok(Self::new(dir, config))
    }

    /// Keep these lock entries even though no package declares them
    #[must_use]
    pub fn with_trigger_packages(mut self, packages: Vec<String>) -> Self {
        self.trigger_packages = packages;
        self
    }

    /// Path of `devbox.json` inside `dir`
    pub fn config_path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Declared package specs
    pub fn package_specs(&self) -> Vec<String> {
        self.config.packages.specs()
    }
}

impl ProjectContext for Project {
    fn project_dir(&self) -> &Path {
        &self.dir
    }

    fn stdenv(&self) -> FlakeRef {
        self.config.stdenv()
    }

    fn config_hash(&self) -> Result<String, ProjectError> {
        cachehash::json(&self.config).map_err(|e| ProjectError::HashError(e.to_string()))
    }

    fn all_package_names_including_removed_trigger_packages(&self) -> Vec<String> {
        let mut names = self.package_specs();
        names.extend(self.trigger_packages.iter().cloned());
        names
    }
}
