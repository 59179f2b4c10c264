//! Command line argument parsing and validation.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Where the release goes after packaging.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum PublishMode {
    /// Assemble the release record only
    None,
    /// Write `releases/<version>/` under the output directory
    #[default]
    Local,
    /// Create or update a GitHub release
    Github,
}

/// Multi-platform release packaging for Rust binaries
#[derive(Parser, Debug, Clone)]
#[command(
    name = "kodegen_bundler_matrix",
    version,
    about = "Builds, packages, signs and publishes a Rust binary for every release target",
    long_about = "Builds the binary for each target of the release matrix, packages it
(tar.gz, deb and rpm on Linux; a signed, notarized dmg on macOS; zip and msi on
Windows) and publishes one release per version.

A tag-triggered run (--tag or RELEASE_TAG) must match the manifest version
exactly and produces a final release; a manual run produces a draft.

Usage:
  kodegen_bundler_matrix --tag v1.2.3
  kodegen_bundler_matrix --target linux-amd64 --target windows-amd64 --publish none
  kodegen_bundler_matrix --skip-build --publish github --github-repo owner/name

Exit code 0 = at least one target produced packages and publishing succeeded."
)]
pub struct Args {
    /// Path to Cargo.toml
    #[arg(long, value_name = "PATH", default_value = "Cargo.toml")]
    pub manifest_path: PathBuf,

    /// Version tag that triggered this run (e.g. v1.2.3)
    #[arg(long, env = "RELEASE_TAG", value_name = "TAG")]
    pub tag: Option<String>,

    /// Restrict the matrix to these `{os}-{arch}` targets (repeatable)
    #[arg(long = "target", value_name = "OS-ARCH")]
    pub targets: Vec<String>,

    /// Use existing artifacts instead of running cargo
    #[arg(long)]
    pub skip_build: bool,

    /// Cargo target directory
    #[arg(long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Per-job working directories
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Where report.json and local releases are written
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Release store
    #[arg(long, value_enum, default_value_t = PublishMode::Local)]
    pub publish: PublishMode,

    /// GitHub repository (owner/name or URL), defaults to the manifest repository
    #[arg(long, env = "GITHUB_REPOSITORY", value_name = "REPO")]
    pub github_repo: Option<String>,

    /// Upper bound on one notarization submission, in seconds
    #[arg(long, value_name = "SECONDS")]
    pub notarization_timeout: Option<u64>,

    /// Override an external tool location (repeatable)
    #[arg(long = "tool", value_name = "NAME=PATH", value_parser = parse_tool)]
    pub tools: Vec<(String, PathBuf)>,

    /// Keep staged bundles and intermediates
    #[arg(long)]
    pub keep_work: bool,

    /// Show verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.notarization_timeout == Some(0) {
            return Err("--notarization-timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

fn parse_tool(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got `{value}`")),
    }
}
