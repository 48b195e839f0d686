//! Flake references and installables
//!
//! A flake reference points at a versioned source of package definitions
//! (`github:NixOS/nixpkgs/nixpkgs-unstable`, `path:./local`, `flake:nixpkgs`).
//! An installable adds an attribute path selecting one package inside it
//! (`github:NixOS/nixpkgs/<rev>#python3`).
//!
//! Both round-trip through their single-string form: [`FlakeRef::parse`] and
//! the [`std::fmt::Display`] impl produce a canonical rendering.

use std::fmt;
use std::str::FromStr;

use crate::error::FlakeRefError;

/// Kind-specific part of a flake reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlakeKind {
    /// Registry lookup by id, e.g. `flake:nixpkgs` or bare `nixpkgs`
    Indirect { id: String },
    /// Local directory
    Path { path: String },
    /// GitHub repository
    GitHub {
        owner: String,
        repo: String,
        host: Option<String>,
    },
    /// Any git remote; `url` excludes the `git+` prefix
    Git { url: String },
    /// Archive fetched over the network
    Tarball { url: String },
    /// Single file fetched over the network
    File { url: String },
}

/// A parsed flake reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlakeRef {
    pub kind: FlakeKind,
    /// Branch or tag name
    pub git_ref: Option<String>,
    /// Full commit hash
    pub rev: Option<String>,
    /// Subdirectory containing the flake
    pub dir: Option<String>,
}

const ARCHIVE_SUFFIXES: &[&str] = &[
    ".tar", ".tar.gz", ".tgz", ".tar.xz", ".txz", ".tar.bz2", ".tbz2", ".tar.zst", ".zip",
];

impl FlakeRef {
    fn new(kind: FlakeKind) -> Self {
        Self {
            kind,
            git_ref: None,
            rev: None,
            dir: None,
        }
    }

    /// `github:owner/repo`
    pub fn github(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::new(FlakeKind::GitHub {
            owner: owner.into(),
            repo: repo.into(),
            host: None,
        })
    }

    /// `flake:id`
    pub fn indirect(id: impl Into<String>) -> Self {
        Self::new(FlakeKind::Indirect { id: id.into() })
    }

    /// `path:path`
    pub fn path(path: impl Into<String>) -> Self {
        Self::new(FlakeKind::Path { path: path.into() })
    }

    /// Set the branch or tag
    #[must_use]
    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    /// Set the commit hash
    #[must_use]
    pub fn with_rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Set `rev` when `value` is a commit hash, `git_ref` otherwise
    #[must_use]
    pub fn with_ref_or_rev(self, value: impl Into<String>) -> Self {
        let value = value.into();
        if is_rev(&value) {
            self.with_rev(value)
        } else {
            self.with_ref(value)
        }
    }

    /// Set the subdirectory
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Whether this is a registry lookup
    pub fn is_indirect(&self) -> bool {
        matches!(self.kind, FlakeKind::Indirect { .. })
    }

    /// Whether the reference already identifies immutable content
    pub fn is_locked(&self) -> bool {
        self.rev.is_some() || matches!(self.kind, FlakeKind::Path { .. })
    }

    /// Parse the string form of a flake reference
    pub fn parse(raw: &str) -> Result<Self, FlakeRefError> {
        if raw.is_empty() {
            return Err(FlakeRefError::Empty);
        }

        if is_bare_path(raw) {
            let (path, query) = split_query(raw);
            return Self::new(FlakeKind::Path {
                path: path.to_string(),
            })
            .apply_query(query, raw);
        }

        let Some((scheme, rest)) = raw.split_once(':') else {
            return parse_indirect(raw, raw);
        };

        match scheme {
            "flake" => parse_indirect(rest, raw),
            "path" => {
                let (path, query) = split_query(rest);
                if path.is_empty() {
                    return Err(invalid(raw, "path is empty"));
                }
                Self::new(FlakeKind::Path {
                    path: path.to_string(),
                })
                .apply_query(query, raw)
            }
            "github" => parse_github(rest, raw),
            "git" | "git+https" | "git+http" | "git+ssh" | "git+file" => {
                let (location, query) = split_query(rest);
                if location.trim_start_matches('/').is_empty() {
                    return Err(invalid(raw, "git url has no location"));
                }
                let url_scheme = scheme.strip_prefix("git+").unwrap_or(scheme);
                Self::new(FlakeKind::Git {
                    url: format!("{url_scheme}:{location}"),
                })
                .apply_query(query, raw)
            }
            "tarball+https" | "tarball+http" | "tarball+file" => Ok(Self::new(FlakeKind::Tarball {
                url: strip_kind_prefix(raw, "tarball+"),
            })),
            "file+https" | "file+http" | "file+file" => Ok(Self::new(FlakeKind::File {
                url: strip_kind_prefix(raw, "file+"),
            })),
            "https" | "http" => {
                let (location, _) = split_query(raw);
                if ARCHIVE_SUFFIXES.iter().any(|s| location.ends_with(s)) {
                    Ok(Self::new(FlakeKind::Tarball {
                        url: raw.to_string(),
                    }))
                } else {
                    Ok(Self::new(FlakeKind::File {
                        url: raw.to_string(),
                    }))
                }
            }
            other => Err(FlakeRefError::UnsupportedScheme {
                scheme: other.to_string(),
                reference: raw.to_string(),
            }),
        }
    }

    fn apply_query(mut self, query: Option<&str>, raw: &str) -> Result<Self, FlakeRefError> {
        let Some(query) = query else {
            return Ok(self);
        };
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = percent_decode(value);
            match key {
                "dir" => self.dir = non_empty(value),
                "ref" => self.git_ref = non_empty(value),
                "rev" => {
                    if !is_rev(&value) {
                        return Err(invalid(raw, "rev must be a 40 character commit hash"));
                    }
                    self.rev = Some(value);
                }
                "host" => {
                    if let FlakeKind::GitHub { host, .. } = &mut self.kind {
                        *host = non_empty(value);
                    }
                }
                // narHash, lastModified and friends describe the locked
                // content, not its identity.
                _ => {}
            }
        }
        Ok(self)
    }
}

impl FromStr for FlakeRef {
    type Err = FlakeRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FlakeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(dir) = &self.dir {
            query.push(("dir", dir.as_str()));
        }

        match &self.kind {
            FlakeKind::Indirect { id } => {
                write!(f, "flake:{id}")?;
                if let Some(git_ref) = &self.git_ref {
                    write!(f, "/{git_ref}")?;
                }
                if let Some(rev) = &self.rev {
                    write!(f, "/{rev}")?;
                }
            }
            FlakeKind::Path { path } => write!(f, "path:{path}")?,
            FlakeKind::GitHub { owner, repo, host } => {
                write!(f, "github:{owner}/{repo}")?;
                match (&self.rev, &self.git_ref) {
                    (Some(rev), git_ref) => {
                        write!(f, "/{rev}")?;
                        if let Some(git_ref) = git_ref {
                            query.push(("ref", git_ref.as_str()));
                        }
                    }
                    (None, Some(git_ref)) => write!(f, "/{git_ref}")?,
                    (None, None) => {}
                }
                if let Some(host) = host {
                    query.push(("host", host.as_str()));
                }
            }
            FlakeKind::Git { url } => {
                if url.starts_with("git:") {
                    write!(f, "{url}")?;
                } else {
                    write!(f, "git+{url}")?;
                }
                if let Some(git_ref) = &self.git_ref {
                    query.push(("ref", git_ref.as_str()));
                }
                if let Some(rev) = &self.rev {
                    query.push(("rev", rev.as_str()));
                }
            }
            FlakeKind::Tarball { url } => write!(f, "tarball+{url}")?,
            FlakeKind::File { url } => write!(f, "file+{url}")?,
        }

        query.sort_unstable();
        for (i, (key, value)) in query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={}", percent_encode(value))?;
        }
        Ok(())
    }
}

/// A flake reference plus the attribute path of one package within it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Installable {
    pub reference: FlakeRef,
    pub attr_path: String,
}

impl Installable {
    pub fn new(reference: FlakeRef, attr_path: impl Into<String>) -> Self {
        Self {
            reference,
            attr_path: attr_path.into(),
        }
    }

    /// Parse `ref#attr.path`; everything after the first `#` is the attribute path
    pub fn parse(raw: &str) -> Result<Self, FlakeRefError> {
        let (reference, attr_path) = raw.split_once('#').unwrap_or((raw, ""));
        if reference.is_empty() {
            return Err(invalid(raw, "missing flake reference before '#'"));
        }
        Ok(Self {
            reference: FlakeRef::parse(reference)?,
            attr_path: attr_path.to_string(),
        })
    }
}

impl FromStr for Installable {
    type Err = FlakeRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Installable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference)?;
        if !self.attr_path.is_empty() {
            write!(f, "#{}", self.attr_path)?;
        }
        Ok(())
    }
}

fn parse_indirect(rest: &str, raw: &str) -> Result<FlakeRef, FlakeRefError> {
    let (location, query) = split_query(rest);
    let mut segments = location.split('/');
    let id = segments.next().unwrap_or_default();
    if !is_flake_id(id) {
        return Err(invalid(raw, "flake id must start with a letter"));
    }

    let mut reference = FlakeRef::indirect(id);
    if let Some(segment) = segments.next() {
        if segment.is_empty() {
            return Err(invalid(raw, "empty path segment"));
        }
        if is_rev(segment) {
            reference.rev = Some(segment.to_string());
        } else {
            reference.git_ref = Some(segment.to_string());
        }
    }
    if let Some(segment) = segments.next() {
        if reference.rev.is_some() || !is_rev(segment) {
            return Err(invalid(raw, "expected flake:<id>/<ref>/<rev>"));
        }
        reference.rev = Some(segment.to_string());
    }
    if segments.next().is_some() {
        return Err(invalid(raw, "too many path segments"));
    }
    reference.apply_query(query, raw)
}

fn parse_github(rest: &str, raw: &str) -> Result<FlakeRef, FlakeRefError> {
    let (location, query) = split_query(rest);
    let segments: Vec<&str> = location.split('/').collect();
    match segments.as_slice() {
        [owner, repo] | [owner, repo, _] if !owner.is_empty() && !repo.is_empty() => {
            let mut reference = FlakeRef::github(*owner, *repo);
            if let Some(segment) = segments.get(2) {
                if segment.is_empty() {
                    return Err(invalid(raw, "empty ref segment"));
                }
                if is_rev(segment) {
                    reference.rev = Some((*segment).to_string());
                } else {
                    reference.git_ref = Some((*segment).to_string());
                }
            }
            reference.apply_query(query, raw)
        }
        _ => Err(invalid(raw, "expected github:<owner>/<repo>[/<ref-or-rev>]")),
    }
}

fn is_bare_path(raw: &str) -> bool {
    raw.starts_with('/')
        || raw.starts_with("./")
        || raw.starts_with("../")
        || raw == "."
        || raw == ".."
}

fn is_flake_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_rev(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn split_query(s: &str) -> (&str, Option<&str>) {
    match s.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (s, None),
    }
}

fn strip_kind_prefix(raw: &str, prefix: &str) -> String {
    raw.strip_prefix(prefix).unwrap_or(raw).to_string()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn invalid(raw: &str, reason: &str) -> FlakeRefError {
    FlakeRefError::Invalid {
        reference: raw.to_string(),
        reason: reason.to_string(),
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(byte) = s
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '&' | '=' | '#' | '?' | ' ' | '+' => out.push_str(&format!("%{:02X}", c as u32)),
            _ => out.push(c),
        }
    }
    out
}
