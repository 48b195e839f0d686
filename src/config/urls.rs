//! Remote endpoints and default references

/// Raw content host for GitHub-hosted plugins
pub const GITHUB_RAW_CONTENT: &str = "https://raw.githubusercontent.com";

/// Owner and repository of nixpkgs on GitHub
pub const NIXPKGS_OWNER: &str = "NixOS";
pub const NIXPKGS_REPO: &str = "nixpkgs";

/// Branch used for the base environment when the project pins no commit
pub const NIXPKGS_DEFAULT_BRANCH: &str = "nixpkgs-unstable";
