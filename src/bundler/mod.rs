//! Per-target packaging.
//!
//! This module turns one compiled binary into trust-verified, platform-native
//! packages, and runs that job for every entry of the release matrix.
//!
//! # Overview
//!
//! For each [`BuildTarget`] the pipeline:
//! 1. Builds (or locates) the binary artifact
//! 2. Stages a deterministically named bundle ([`BundleName`])
//! 3. Packages it with the target's [`PlatformPackager`]
//! 4. Collects the package files with their checksums
//!
//! Targets run concurrently and fail independently; see [`Pipeline`].
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_matrix::bundler::{Pipeline, SettingsBuilder, PackageSettings, default_matrix};
//!
//! # async fn example(version: kodegen_bundler_matrix::version::ReleaseVersion) -> kodegen_bundler_matrix::bundler::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .project_dir(".")
//!     .version(version)
//!     .package_settings(PackageSettings {
//!         product_name: "akron".into(),
//!         binary_name: "akron".into(),
//!         ..Default::default()
//!     })
//!     .build()?;
//!
//! let report = Pipeline::new(settings, default_matrix()).run().await;
//! for outcome in report.targets() {
//!     println!("{}: {}", outcome.target.label(), outcome.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod collector;
pub mod error;
pub mod platform;
pub mod resources;
pub mod settings;
pub mod target;
pub mod template;
pub mod utils;

pub use builder::{
    MacCredentials, NotarizationAuth, Pipeline, PipelineReport, PipelineStatus,
    SigningCredentials, TargetOutcome, TargetStatus, load_mac_credentials, preflight,
};
pub use collector::BundledArtifact;
pub use error::{Error, FailureKind, Result};
pub use platform::{PackageType, PlatformPackager};
pub use settings::{
    Arch, BundleSettings, DebianSettings, MacOsSettings, PackageSettings, Settings,
    SettingsBuilder, WindowsSettings,
};
pub use target::{BuildTarget, BundleName, OperatingSystem, default_matrix, filter_matrix};
