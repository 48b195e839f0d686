//! Package classification
//!
//! Every package spec a project declares falls into exactly one class, which
//! decides how the lock store resolves it:
//!
//! | Class | Spec looks like |
//! |---|---|
//! | [`PackageKind::RunX`] | `runx:owner/repo@version` |
//! | [`PackageKind::Versioned`] | `python@3.12` |
//! | [`PackageKind::Flake`] | `github:owner/repo#attr`, `path:./x`, `flake:nixpkgs#hello` |
//! | [`PackageKind::Legacy`] | `python3`, `nixpkgs#hello` |
//! | [`PackageKind::Unresolvable`] | anything else, e.g. `svn:foo` |

use std::fmt;

use crate::config::defaults::RUNX_PREFIX;
use crate::core::flake::Installable;

/// Resolution class of a package spec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    /// Tool resolved through the RunX registry
    RunX,
    /// `name@version`, resolved through the search index
    Versioned,
    /// Explicit flake installable
    Flake,
    /// Bare name resolved against the locked base nixpkgs
    Legacy,
    /// Matches none of the above
    Unresolvable,
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RunX => "runx",
            Self::Versioned => "versioned",
            Self::Flake => "flake",
            Self::Legacy => "legacy",
            Self::Unresolvable => "unresolvable",
        };
        write!(f, "{name}")
    }
}

/// Classify a package spec
pub fn classify(spec: &str) -> PackageKind {
    if is_runx(spec) {
        PackageKind::RunX
    } else if is_versioned(spec) {
        PackageKind::Versioned
    } else if is_flake(spec) {
        PackageKind::Flake
    } else if is_legacy_package(spec) {
        PackageKind::Legacy
    } else {
        PackageKind::Unresolvable
    }
}

/// Spec carries the RunX registry prefix
pub fn is_runx(spec: &str) -> bool {
    spec.starts_with(RUNX_PREFIX)
}

/// Split `name@version` at the last `@`.
///
/// The version must be non-empty; `name@` is not versioned but `@version` is.
pub fn parse_versioned_package(spec: &str) -> Option<(&str, &str)> {
    let (name, version) = spec.rsplit_once('@')?;
    if version.is_empty() {
        return None;
    }
    Some((name, version))
}

/// Spec selects an explicit version and is not a RunX package
pub fn is_versioned(spec: &str) -> bool {
    !is_runx(spec) && parse_versioned_package(spec).is_some()
}

/// Spec is an unambiguous flake installable
pub fn is_flake(spec: &str) -> bool {
    if is_runx(spec) || is_versioned(spec) {
        return false;
    }
    match Installable::parse(spec) {
        Ok(installable) => !is_ambiguous(spec, &installable),
        Err(_) => false,
    }
}

/// An indirect reference written without `flake:` could just as well be a
/// plain package name (`nixpkgs`, `hello`, `nixpkgs#hello`).
pub fn is_ambiguous(raw: &str, parsed: &Installable) -> bool {
    parsed.reference.is_indirect() && !raw.starts_with("flake:")
}

/// Bare package name: no version, no scheme, not an absolute path, and not
/// claimed by any other class.
pub fn is_legacy_package(spec: &str) -> bool {
    !is_runx(spec)
        && !is_versioned(spec)
        && !is_flake(spec)
        && !spec.contains(':')
        && !spec.starts_with('/')
}
