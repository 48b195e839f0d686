//! Lock file handling
//!
//! The lock file (`devbox.lock`) maps every package spec a project declares to
//! the immutable reference it resolved to, so repeated invocations install the
//! same thing. [`LockFile`] is the on-disk model; [`LockStore`] loads it,
//! resolves specs into it, and writes it back only when its content changed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::defaults::{DEFAULT_OUTPUT_NAME, LOCK_FILE_NAME, LOCK_FILE_VERSION};
use crate::core::cachehash;
use crate::core::flake::{FlakeRef, Installable};
use crate::core::pkgtype::{classify, PackageKind};
use crate::core::project::ProjectContext;
use crate::core::resolver::PackageResolver;
use crate::core::statehash::{self, StateHashArgs};
use crate::error::LockError;
use crate::infra::{filesystem, system};

/// Where a locked package was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageSource {
    /// Attribute of the pinned base nixpkgs
    #[serde(rename = "nixpkg")]
    Nixpkg,
    /// Package search index (`name@version`)
    #[serde(rename = "devbox-search")]
    SearchIndex,
    /// Explicit flake installable
    #[serde(rename = "flake")]
    Flake,
    /// RunX registry
    #[serde(rename = "runx")]
    RunX,
}

/// One build output of a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// Installed when no output is selected explicitly
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
}

/// Per-system build information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Output>,

    /// Single output path written by older versions
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub store_path: String,

    /// `outputs` was derived from `store_path` on load and must not be written
    #[serde(skip)]
    outputs_from_store_path: bool,
}

impl SystemInfo {
    /// Whether `outputs` came from the legacy `store_path` field
    pub fn outputs_from_store_path(&self) -> bool {
        self.outputs_from_store_path
    }

    /// Replace the outputs with natively stored ones
    pub fn set_outputs(&mut self, outputs: Vec<Output>) {
        self.outputs = outputs;
        self.outputs_from_store_path = false;
    }

    fn ensure_outputs(&mut self) {
        if self.outputs.is_empty() && !self.store_path.is_empty() {
            self.outputs = vec![Output {
                name: DEFAULT_OUTPUT_NAME.to_string(),
                path: self.store_path.clone(),
                default: true,
            }];
            self.outputs_from_store_path = true;
        }
    }

    fn persisted(&self) -> Self {
        if self.outputs_from_store_path {
            Self {
                outputs: Vec::new(),
                store_path: self.store_path.clone(),
                outputs_from_store_path: false,
            }
        } else {
            self.clone()
        }
    }
}

/// A locked package entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_modified: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plugin_version: String,

    /// Immutable install reference; empty while unresolved
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resolved: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PackageSource>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_insecure: bool,

    /// Keyed by Nix system, e.g. `x86_64-linux`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub systems: BTreeMap<String, SystemInfo>,
}

impl Package {
    pub fn is_resolved(&self) -> bool {
        !self.resolved.is_empty()
    }
}

/// Lock file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    /// Lock file format version
    #[serde(default = "default_lockfile_version")]
    pub lockfile_version: String,

    /// Locked packages keyed by the spec the project declares
    #[serde(default)]
    pub packages: BTreeMap<String, Package>,
}

fn default_lockfile_version() -> String {
    LOCK_FILE_VERSION.to_string()
}

impl LockFile {
    /// Create an empty lock file
    pub fn new() -> Self {
        Self {
            lockfile_version: LOCK_FILE_VERSION.to_string(),
            packages: BTreeMap::new(),
        }
    }

    /// Path of the lock file inside `project_dir`
    pub fn path(project_dir: &Path) -> PathBuf {
        project_dir.join(LOCK_FILE_NAME)
    }

    /// Read the lock file of `project_dir`.
    ///
    /// A missing file yields an empty lock file. Legacy `store_path` entries
    /// are expanded into `outputs`.
    pub fn read(project_dir: &Path) -> Result<Self, LockError> {
        let path = Self::path(project_dir);
        let content = filesystem::read_if_exists(&path).map_err(|e| LockError::ReadError {
            path: path.clone(),
            error: e.to_string(),
        })?;
        let Some(content) = content else {
            return Ok(Self::new());
        };
        let mut lock_file: Self =
            serde_json::from_slice(&content).map_err(|e| LockError::ParseError {
                path: path.clone(),
                error: e.to_string(),
            })?;
        lock_file.ensure_packages_have_outputs();
        Ok(lock_file)
    }

    /// Parse from a JSON string, expanding legacy `store_path` entries
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let mut lock_file: Self = serde_json::from_str(content)?;
        lock_file.ensure_packages_have_outputs();
        Ok(lock_file)
    }

    /// Serialize the on-disk form: pretty JSON, trailing newline, legacy
    /// entries in their original shape
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut content = serde_json::to_string_pretty(&self.persisted())?;
        content.push('\n');
        Ok(content)
    }

    /// Write the on-disk form to `path`
    pub fn write(&self, path: &Path) -> Result<(), LockError> {
        let content = self
            .to_json()
            .map_err(|e| LockError::HashError(e.to_string()))?;
        filesystem::write_atomic(path, content.as_bytes()).map_err(|e| LockError::WriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Hash of the semantic content, independent of insertion order
    pub fn content_hash(&self) -> Result<String, LockError> {
        cachehash::json(self).map_err(|e| LockError::HashError(e.to_string()))
    }

    fn ensure_packages_have_outputs(&mut self) {
        for package in self.packages.values_mut() {
            for info in package.systems.values_mut() {
                info.ensure_outputs();
            }
        }
    }

    fn persisted(&self) -> Self {
        let mut persisted = self.clone();
        for package in persisted.packages.values_mut() {
            for info in package.systems.values_mut() {
                *info = info.persisted();
            }
        }
        persisted
    }
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads, resolves into, and conditionally saves a project's lock file.
///
/// One store serves one command invocation. It is not synchronized; callers
/// sharing a project across threads need one store per thread or their own
/// locking.
pub struct LockStore<'a> {
    project: &'a dyn ProjectContext,
    resolver: &'a dyn PackageResolver,
    file: LockFile,
    /// Locked base references by unlocked reference string
    locked_stdenv: HashMap<String, FlakeRef>,
    stdenv_depth: usize,
}

impl<'a> LockStore<'a> {
    /// Load the project's lock file, or start an empty one if there is none
    pub fn load(
        project: &'a dyn ProjectContext,
        resolver: &'a dyn PackageResolver,
    ) -> Result<Self, LockError> {
        let file = LockFile::read(project.project_dir())?;
        tracing::debug!(
            "Loaded lock file with {} packages from {}",
            file.packages.len(),
            project.project_dir().display()
        );
        Ok(Self {
            project,
            resolver,
            file,
            locked_stdenv: HashMap::new(),
            stdenv_depth: 0,
        })
    }

    /// In-memory lock file
    pub fn lock_file(&self) -> &LockFile {
        &self.file
    }

    /// Path of the lock file on disk
    pub fn path(&self) -> PathBuf {
        LockFile::path(self.project.project_dir())
    }

    /// Resolve every spec, then save.
    ///
    /// Stops at the first failure without saving; specs resolved before it
    /// stay in memory.
    pub fn add<S: AsRef<str>>(&mut self, specs: &[S]) -> Result<(), LockError> {
        for spec in specs {
            self.resolve(spec.as_ref())?;
        }
        self.save()
    }

    /// Drop the entries for `specs` (absent ones are ignored), then save
    pub fn remove<S: AsRef<str>>(&mut self, specs: &[S]) -> Result<(), LockError> {
        for spec in specs {
            let spec = spec.as_ref();
            if self.file.packages.remove(spec).is_some() {
                tracing::debug!("Removed {spec} from lock file");
            }
            self.locked_stdenv.remove(spec);
        }
        self.save()
    }

    /// Resolve `spec`, reusing its entry when it is already resolved.
    ///
    /// Updates the in-memory lock file only. The entry is stored even when it
    /// stays unresolved, which happens for specs of no known form and for
    /// flakes the resolver has nothing to lock for.
    pub fn resolve(&mut self, spec: &str) -> Result<&Package, LockError> {
        self.resolve_entry(spec).map(|package| &*package)
    }

    /// Resolved entry for `spec`; never resolves
    pub fn get(&self, spec: &str) -> Option<&Package> {
        self.file.packages.get(spec).filter(|p| p.is_resolved())
    }

    /// Specs with an entry that is still unresolved
    pub fn unresolved(&self) -> Vec<&str> {
        self.file
            .packages
            .iter()
            .filter(|(_, package)| !package.is_resolved())
            .map(|(spec, _)| spec.as_str())
            .collect()
    }

    /// Write the lock file if its content differs from what is on disk
    pub fn save(&self) -> Result<(), LockError> {
        if !self.is_dirty()? {
            tracing::debug!("Lock file unchanged, skipping write");
            return Ok(());
        }
        let path = self.path();
        self.file.write(&path)?;
        tracing::info!("Updated {}", path.display());
        Ok(())
    }

    /// Whether the in-memory content differs from the file on disk
    pub fn is_dirty(&self) -> Result<bool, LockError> {
        let current = self.file.content_hash()?;
        let on_disk = LockFile::read(self.project.project_dir())?.content_hash()?;
        Ok(current != on_disk)
    }

    /// Drop entries the project no longer declares.
    ///
    /// Keeps declared specs, removed trigger packages, and the base
    /// reference. Does not save.
    pub fn tidy(&mut self) {
        let mut keep: HashSet<String> = self
            .project
            .all_package_names_including_removed_trigger_packages()
            .into_iter()
            .collect();
        keep.insert(self.project.stdenv().to_string());

        let before = self.file.packages.len();
        self.file.packages.retain(|spec, _| keep.contains(spec));
        tracing::debug!(
            "Tidy removed {} unused lock entries",
            before - self.file.packages.len()
        );
    }

    /// Re-resolve the base reference from scratch
    pub fn update_stdenv(&mut self) -> Result<(), LockError> {
        let stdenv = self.project.stdenv();
        self.resolver.clear_flake_cache(&stdenv)?;
        let key = stdenv.to_string();
        self.remove(&[key.as_str()])?;
        self.add(&[key.as_str()])
    }

    /// Locked base reference.
    ///
    /// Resolves the project's unlocked base reference through the lock file.
    /// Falls back to the unlocked reference when it cannot be locked.
    pub fn stdenv(&mut self) -> FlakeRef {
        let unlocked = self.project.stdenv();
        let key = unlocked.to_string();
        if let Some(locked) = self.locked_stdenv.get(&key) {
            return locked.clone();
        }
        // Locking the base reference must not need the base reference.
        if self.stdenv_depth > 0 {
            return unlocked;
        }

        self.stdenv_depth += 1;
        debug_assert!(self.stdenv_depth <= 1);
        let resolved = self.resolve(&key).map(|p| p.resolved.clone());
        self.stdenv_depth -= 1;

        match resolved {
            Ok(resolved) if !resolved.is_empty() => match Installable::parse(&resolved) {
                Ok(installable) => {
                    self.locked_stdenv.insert(key, installable.reference.clone());
                    installable.reference
                }
                Err(e) => {
                    tracing::warn!("Locked reference {resolved} for {key} is invalid: {e}");
                    unlocked
                }
            },
            Ok(_) => unlocked,
            Err(e) => {
                tracing::warn!("Could not lock {key}, using it unlocked: {e}");
                unlocked
            }
        }
    }

    /// Record `outputs` for `spec` on the current system, then save
    pub fn set_outputs_for_package(
        &mut self,
        spec: &str,
        outputs: Vec<Output>,
    ) -> Result<(), LockError> {
        let system = system::current_system();
        let package = self.resolve_entry(spec)?;
        package.systems.entry(system).or_default().set_outputs(outputs);
        self.save()
    }

    /// Whether the lock file is clean and the recorded installation state
    /// still matches the project
    pub fn is_up_to_date_and_installed(&self, is_fish: bool) -> Result<bool, LockError> {
        if self.is_dirty()? {
            return Ok(false);
        }
        let args = self.state_hash_args(is_fish)?;
        Ok(statehash::is_state_up_to_date(&args)?)
    }

    /// Record that the current lock file has been installed
    pub fn update_installed_state(&self, is_fish: bool) -> Result<(), LockError> {
        let args = self.state_hash_args(is_fish)?;
        Ok(statehash::update_state_hash_file(&args)?)
    }

    pub fn has_allow_insecure_packages(&self) -> bool {
        self.file.packages.values().any(|p| p.allow_insecure)
    }

    fn state_hash_args(&self, is_fish: bool) -> Result<StateHashArgs<'_>, LockError> {
        Ok(StateHashArgs {
            project_dir: self.project.project_dir(),
            config_hash: self.project.config_hash()?,
            is_fish,
        })
    }

    fn resolve_entry(&mut self, spec: &str) -> Result<&mut Package, LockError> {
        let cached = self.file.packages.get(spec).is_some_and(Package::is_resolved);
        if !cached {
            let locked = self.lock_package(spec)?;
            self.file.packages.insert(spec.to_string(), locked);
        }
        Ok(self.file.packages.entry(spec.to_string()).or_default())
    }

    fn lock_package(&mut self, spec: &str) -> Result<Package, LockError> {
        let kind = classify(spec);
        tracing::debug!("Resolving {spec} as {kind} package");
        match kind {
            PackageKind::RunX | PackageKind::Versioned | PackageKind::Flake => {
                Ok(self.resolver.fetch_resolved_package(spec)?.unwrap_or_default())
            }
            PackageKind::Legacy => {
                let stdenv = self.stdenv();
                Ok(Package {
                    resolved: Installable::new(stdenv, spec).to_string(),
                    source: Some(PackageSource::Nixpkg),
                    ..Package::default()
                })
            }
            PackageKind::Unresolvable => {
                tracing::warn!("{spec} is not a known package format, leaving it unresolved");
                Ok(Package::default())
            }
        }
    }
}
