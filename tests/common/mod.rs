//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Output};

use devlock::core::flake::FlakeRef;
use devlock::core::lock::Package;
use devlock::core::resolver::PackageResolver;
use devlock::error::ResolveError;
use tempfile::TempDir;

/// Commit used to pin nixpkgs in sample configs
#[allow(dead_code)]
pub const NIXPKGS_REV: &str = "75a52265bda7fd25e06e3a67dee3f0354e73243c";

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a project whose devbox.json declares `packages` on pinned nixpkgs
    pub fn with_packages(packages: &[&str]) -> Self {
        let project = Self::new();
        project.write_config(packages);
        project
    }

    /// Rewrite devbox.json with `packages` on pinned nixpkgs
    pub fn write_config(&self, packages: &[&str]) {
        let config = serde_json::json!({
            "packages": packages,
            "nixpkgs": { "commit": NIXPKGS_REV },
        });
        self.create_file(
            "devbox.json",
            &serde_json::to_string_pretty(&config).expect("Failed to encode config"),
        );
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Parse the lock file as JSON
    pub fn read_lock(&self) -> serde_json::Value {
        serde_json::from_str(&self.read_file("devbox.lock")).expect("Lock file is not JSON")
    }

    /// Run the devlock binary against this project
    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .expect("Failed to execute devlock")
    }

    /// devlock command against this project, for adding env vars
    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_devlock"));
        cmd.arg("-C").arg(self.path());
        cmd.args(args);
        cmd.env("DEVLOCK_CACHE_DIR", self.path().join(".cache"));
        cmd.env_remove("GITHUB_TOKEN");
        cmd.env_remove("DEVBOX_X_GITHUB_PLUGIN_CACHE_TTL");
        cmd
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolver answering from a fixed table and recording every call
#[derive(Default)]
pub struct RecordingResolver {
    pub responses: HashMap<String, String>,
    pub calls: RefCell<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `spec` to `resolved`
    pub fn respond(mut self, spec: &str, resolved: &str) -> Self {
        self.responses.insert(spec.to_string(), resolved.to_string());
        self
    }

    pub fn calls_for(&self, spec: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == spec).count()
    }
}

impl PackageResolver for RecordingResolver {
    fn fetch_resolved_package(&self, spec: &str) -> Result<Option<Package>, ResolveError> {
        self.calls.borrow_mut().push(spec.to_string());
        match self.responses.get(spec) {
            Some(resolved) => Ok(Some(Package {
                resolved: resolved.clone(),
                ..Package::default()
            })),
            None => Err(ResolveError::Failed {
                package: spec.to_string(),
                error: "not in the test index".to_string(),
            }),
        }
    }

    fn clear_flake_cache(&self, _reference: &FlakeRef) -> Result<(), ResolveError> {
        Ok(())
    }
}
