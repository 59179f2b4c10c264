//! Top-level error types.
//!
//! Target-scoped failures live in [`crate::bundler::Error`] and never abort
//! the run. [`BundlerError`] covers what does: arguments, the manifest, the
//! version gate and publishing.

use thiserror::Error;

/// Result type alias for run-level operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for run-level operations
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Manifest content errors
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Version gate failures
    #[error("version gate failed: {0}")]
    Version(#[from] crate::version::VersionError),

    /// Bundler errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),

    /// Publishing errors
    #[error("publish failed: {0}")]
    Publish(#[from] crate::publish::PublishError),

    /// No target produced a package
    #[error("no target produced any package")]
    NoPackages,
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}
