//! External package resolution
//!
//! Versioned, flake and RunX specs are resolved by collaborators outside the
//! lock store: a search index, the flake tooling, and the RunX registry. This
//! module defines the capabilities the lock store consumes, RunX reference
//! handling, and [`PinnedRefResolver`], an offline resolver that only accepts
//! specs which are already reproducible.

use std::fmt;

use crate::config::defaults::RUNX_PREFIX;
use crate::core::flake::{FlakeRef, Installable};
use crate::core::lock::{Package, PackageSource};
use crate::core::pkgtype::{classify, PackageKind};
use crate::error::ResolveError;

/// Resolves specs the lock store cannot resolve on its own
pub trait PackageResolver {
    /// Resolve a RunX, versioned or flake spec.
    ///
    /// `Ok(None)` means there is nothing to lock for this spec.
    fn fetch_resolved_package(&self, spec: &str) -> Result<Option<Package>, ResolveError>;

    /// Drop any cached resolution of `reference` so the next resolve is fresh
    fn clear_flake_cache(&self, reference: &FlakeRef) -> Result<(), ResolveError>;
}

/// Maps a RunX tool reference to a concrete version
pub trait RunxRegistry {
    fn resolve_version(&self, reference: &RunxRef) -> Result<RunxRef, ResolveError>;
}

/// `owner/repo[@version]` reference to a RunX tool
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunxRef {
    pub owner: String,
    pub repo: String,
    pub version: Option<String>,
}

impl RunxRef {
    /// Parse `owner/repo[@version]` (without the `runx:` prefix)
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let invalid = |reason: &str| ResolveError::InvalidRunxRef {
            package: raw.to_string(),
            reason: reason.to_string(),
        };

        let (path, version) = match raw.split_once('@') {
            Some((path, version)) if version.is_empty() => {
                return Err(invalid(&format!("empty version in '{path}@'")))
            }
            Some((path, version)) => (path, Some(version.to_string())),
            None => (raw, None),
        };
        let (owner, repo) = path
            .split_once('/')
            .ok_or_else(|| invalid("expected owner/repo"))?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(invalid("expected owner/repo"));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            version,
        })
    }
}

impl fmt::Display for RunxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

/// Resolve a `runx:` spec to a concrete tool version
pub fn resolve_runx_package(
    spec: &str,
    registry: &dyn RunxRegistry,
) -> Result<RunxRef, ResolveError> {
    let reference = RunxRef::parse(spec.strip_prefix(RUNX_PREFIX).unwrap_or(spec))?;
    registry.resolve_version(&reference)
}

/// Lock entry for a `runx:` spec
pub fn runx_package(spec: &str, registry: &dyn RunxRegistry) -> Result<Package, ResolveError> {
    let resolved = resolve_runx_package(spec, registry)?;
    tracing::debug!("Resolved {spec} to {resolved}");
    Ok(Package {
        resolved: format!("{RUNX_PREFIX}{resolved}"),
        version: resolved.version.clone().unwrap_or_default(),
        source: Some(PackageSource::RunX),
        ..Package::default()
    })
}

/// Offline resolver.
///
/// Flake specs whose reference is already pinned (a commit hash or a local
/// path) lock to themselves and unpinned flakes lock to nothing. RunX specs
/// go to the registry when one is configured. Versioned specs need the search
/// index and always fail.
#[derive(Default)]
pub struct PinnedRefResolver {
    runx: Option<Box<dyn RunxRegistry>>,
}

impl PinnedRefResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `runx:` specs through `registry`
    #[must_use]
    pub fn with_runx_registry(mut self, registry: Box<dyn RunxRegistry>) -> Self {
        self.runx = Some(registry);
        self
    }
}

impl PackageResolver for PinnedRefResolver {
    fn fetch_resolved_package(&self, spec: &str) -> Result<Option<Package>, ResolveError> {
        match classify(spec) {
            PackageKind::Flake => {
                let installable = Installable::parse(spec)?;
                if !installable.reference.is_locked() {
                    tracing::debug!("Flake {spec} is not pinned, nothing to lock offline");
                    return Ok(None);
                }
                Ok(Some(Package {
                    resolved: installable.to_string(),
                    source: Some(PackageSource::Flake),
                    ..Package::default()
                }))
            }
            PackageKind::RunX => match &self.runx {
                Some(registry) => runx_package(spec, registry.as_ref()).map(Some),
                None => Err(ResolveError::Unavailable {
                    package: spec.to_string(),
                }),
            },
            _ => Err(ResolveError::Unavailable {
                package: spec.to_string(),
            }),
        }
    }

    fn clear_flake_cache(&self, _reference: &FlakeRef) -> Result<(), ResolveError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRegistry;

    impl RunxRegistry for FixedRegistry {
        fn resolve_version(&self, reference: &RunxRef) -> Result<RunxRef, ResolveError> {
            Ok(RunxRef {
                version: Some(
                    reference
                        .version
                        .clone()
                        .filter(|v| v != "latest")
                        .unwrap_or_else(|| "v1.55.2".to_string()),
                ),
                ..reference.clone()
            })
        }
    }

    #[test]
    fn test_runx_ref_parse() {
        let reference = RunxRef::parse("golangci/golangci-lint@v1.2.3").unwrap();
        assert_eq!(reference.owner, "golangci");
        assert_eq!(reference.repo, "golangci-lint");
        assert_eq!(reference.version.as_deref(), Some("v1.2.3"));
        assert_eq!(reference.to_string(), "golangci/golangci-lint@v1.2.3");

        assert_eq!(RunxRef::parse("a/b").unwrap().version, None);
        assert!(RunxRef::parse("no-slash").is_err());
        assert!(RunxRef::parse("a/b/c").is_err());
        assert!(RunxRef::parse("a/b@").is_err());
    }

    #[test]
    fn test_runx_package_uses_registry_version() {
        let package = runx_package("runx:golangci/golangci-lint@latest", &FixedRegistry).unwrap();
        assert_eq!(package.resolved, "runx:golangci/golangci-lint@v1.55.2");
        assert_eq!(package.version, "v1.55.2");
        assert_eq!(package.source, Some(PackageSource::RunX));
    }

    #[test]
    fn test_pinned_resolver_locks_pinned_flakes_only() {
        let resolver = PinnedRefResolver::new();
        let rev = "75a52265bda7fd25e06e3a67dee3f0354e73243c";

        let pinned = resolver
            .fetch_resolved_package(&format!("github:NixOS/nixpkgs/{rev}#hello"))
            .unwrap()
            .unwrap();
        assert_eq!(pinned.resolved, format!("github:NixOS/nixpkgs/{rev}#hello"));
        assert_eq!(pinned.source, Some(PackageSource::Flake));

        let unpinned = resolver
            .fetch_resolved_package("github:NixOS/nixpkgs/nixpkgs-unstable#hello")
            .unwrap();
        assert!(unpinned.is_none());
    }

    #[test]
    fn test_pinned_resolver_rejects_versioned_and_runx_without_registry() {
        let resolver = PinnedRefResolver::new();
        assert!(matches!(
            resolver.fetch_resolved_package("python@3.12"),
            Err(ResolveError::Unavailable { .. })
        ));
        assert!(matches!(
            resolver.fetch_resolved_package("runx:a/b"),
            Err(ResolveError::Unavailable { .. })
        ));

        let with_registry = PinnedRefResolver::new().with_runx_registry(Box::new(FixedRegistry));
        let package = with_registry
            .fetch_resolved_package("runx:a/b")
            .unwrap()
            .unwrap();
        assert_eq!(package.resolved, "runx:a/b@v1.55.2");
    }
}
