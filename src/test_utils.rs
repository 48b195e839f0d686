//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a bare package name (`python3`, `go_1_21`)
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,20}".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Generate a version selector
    pub fn version() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("latest".to_string()),
            (1u32..30, 0u32..20).prop_map(|(major, minor)| format!("{major}.{minor}")),
            (1u32..30, 0u32..20, 0u32..20)
                .prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}")),
        ]
    }

    /// Generate a 40 character commit hash
    pub fn git_rev() -> impl Strategy<Value = String> {
        "[0-9a-f]{40}"
    }

    /// Generate a GitHub flake reference
    pub fn github_ref() -> impl Strategy<Value = String> {
        (
            "[a-zA-Z][a-zA-Z0-9-]{0,10}",
            "[a-zA-Z][a-zA-Z0-9_.-]{0,10}",
            prop::option::of(prop_oneof![git_rev(), "[a-z][a-z0-9.-]{0,10}"]),
        )
            .prop_map(|(owner, repo, suffix)| match suffix {
                Some(suffix) => format!("github:{owner}/{repo}/{suffix}"),
                None => format!("github:{owner}/{repo}"),
            })
    }

    /// Generate package specs covering every resolution class plus noise
    pub fn package_spec() -> impl Strategy<Value = String> {
        prop_oneof![
            package_name(),
            (package_name(), version()).prop_map(|(name, version)| format!("{name}@{version}")),
            (package_name(), package_name(), prop::option::of(version())).prop_map(
                |(owner, repo, version)| match version {
                    Some(version) => format!("runx:{owner}/{repo}@{version}"),
                    None => format!("runx:{owner}/{repo}"),
                }
            ),
            (github_ref(), prop::option::of(package_name())).prop_map(|(reference, attr)| {
                match attr {
                    Some(attr) => format!("{reference}#{attr}"),
                    None => reference,
                }
            }),
            package_name().prop_map(|name| format!("flake:nixpkgs#{name}")),
            package_name().prop_map(|name| format!("nixpkgs#{name}")),
            package_name().prop_map(|name| format!("path:./{name}")),
            package_name().prop_map(|name| format!("/opt/{name}")),
            package_name().prop_map(|name| format!("./{name}")),
            "[a-z]{1,6}:[a-z0-9/]{0,10}",
            ".{0,24}",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'));
        }

        #[test]
        fn test_git_rev_generator(rev in git_rev()) {
            prop_assert_eq!(rev.len(), 40);
            prop_assert!(rev.chars().all(|c| c.is_ascii_hexdigit()));
        }

        #[test]
        fn test_github_ref_generator(reference in github_ref()) {
            prop_assert!(reference.starts_with("github:"));
        }
    }
}
