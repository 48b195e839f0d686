//! Output formatting and progress indicators
//!
//! Human-readable messages go to stdout unless `--quiet` is set. With
//! `--json`, commands print a single JSON document instead.

use std::sync::OnceLock;

use indicatif::{ProgressBar, ProgressStyle};

static OUTPUT: OnceLock<OutputConfig> = OnceLock::new();

/// Global output settings taken from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub quiet: bool,
    pub json: bool,
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make these settings visible to the print helpers.
    ///
    /// Only the first call has an effect.
    pub fn apply_global(self) {
        let _ = OUTPUT.set(self);
    }

    /// Settings applied with [`apply_global`](Self::apply_global), or defaults
    pub fn current() -> Self {
        OUTPUT.get().copied().unwrap_or_default()
    }

    /// Whether human-readable messages should be printed
    pub fn show_messages(&self) -> bool {
        !self.quiet && !self.json
    }

    /// Tracing level for the configured verbosity
    pub fn log_level(&self) -> tracing::Level {
        match (self.quiet, self.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, _) => tracing::Level::DEBUG,
        }
    }
}

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    if !OutputConfig::current().show_messages() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.blue} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Print a success line
pub fn print_success(message: &str) {
    if OutputConfig::current().show_messages() {
        println!("{} {message}", status::SUCCESS);
    }
}

/// Print a warning line
pub fn print_warning(message: &str) {
    if OutputConfig::current().show_messages() {
        println!("{} {message}", status::WARNING);
    }
}

/// Print an indented detail line
pub fn print_detail(message: &str) {
    if OutputConfig::current().show_messages() {
        println!("  {message}");
    }
}

/// Print a JSON document when `--json` is set
pub fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    if OutputConfig::current().json {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

/// Report a command failure on stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_follows_verbosity() {
        assert_eq!(OutputConfig::new(false, false, 0).log_level(), tracing::Level::WARN);
        assert_eq!(OutputConfig::new(false, false, 1).log_level(), tracing::Level::INFO);
        assert_eq!(OutputConfig::new(false, false, 3).log_level(), tracing::Level::DEBUG);
        assert_eq!(OutputConfig::new(true, false, 2).log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_json_suppresses_messages() {
        assert!(OutputConfig::new(false, false, 0).show_messages());
        assert!(!OutputConfig::new(false, true, 0).show_messages());
        assert!(!OutputConfig::new(true, false, 0).show_messages());
    }
}
