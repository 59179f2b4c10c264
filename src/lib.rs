//! Multi-platform release packaging for Rust binaries.
//!
//! One run takes a project at a single version through the whole release
//! matrix:
//! - Linux (amd64, arm64): `.tar.gz`, `.deb`, `.rpm`
//! - macOS (amd64, arm64): signed, notarized and stapled `.dmg`
//! - Windows (amd64): `.zip`, `.msi`
//!
//! and publishes one release per version. It can be used both as a CLI tool
//! and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;
pub mod publish;
pub mod version;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
