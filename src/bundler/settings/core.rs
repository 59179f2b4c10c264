//! Core Settings struct and implementations.

use super::{BundleSettings, PackageSettings};
use crate::bundler::{builder::MacCredentials, utils::process::ToolSet};
use crate::version::ReleaseVersion;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bound on a notarization submission (two hours).
pub const DEFAULT_NOTARIZATION_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Main settings for a release run.
///
/// Central, read-only configuration shared by every target job. Constructed
/// via [`SettingsBuilder`](super::SettingsBuilder).
///
/// # See Also
///
/// - [`PackageSettings`] - Package metadata
/// - [`BundleSettings`] - Bundle configuration
#[derive(Clone, Debug)]
pub struct Settings {
    /// Package metadata.
    package: PackageSettings,

    /// Resolved release version.
    version: ReleaseVersion,

    /// Bundle configuration.
    bundle_settings: BundleSettings,

    /// Directory containing the project manifest.
    project_dir: PathBuf,

    /// Cargo target directory holding `<triple>/release/<binary>`.
    target_dir: PathBuf,

    /// Root of the per-target working areas.
    work_dir: PathBuf,

    /// Directory receiving the release record and report.
    output_dir: PathBuf,

    /// Use prebuilt artifacts instead of invoking the builder.
    skip_build: bool,

    /// Keep staged bundles after packaging.
    keep_work: bool,

    /// Upper bound on one notarization submission.
    notarization_timeout: Duration,

    /// External tool resolution.
    tools: ToolSet,

    /// macOS signing/notarization material.
    mac_credentials: Option<MacCredentials>,
}

impl Settings {
    /// Returns the product name.
    pub fn product_name(&self) -> &str {
        &self.package.product_name
    }

    /// Returns the human readable name (display name or product name).
    pub fn display_name(&self) -> &str {
        self.bundle_settings
            .display_name
            .as_deref()
            .unwrap_or(&self.package.product_name)
    }

    /// Returns the compiled binary name.
    pub fn binary_name(&self) -> &str {
        &self.package.binary_name
    }

    /// Returns the release version.
    pub fn version(&self) -> &ReleaseVersion {
        &self.version
    }

    /// Returns the version string.
    pub fn version_string(&self) -> &str {
        self.version.as_str()
    }

    /// Returns the package description.
    pub fn description(&self) -> &str {
        &self.package.description
    }

    /// Returns the bundle identifier, defaulting to a reverse-DNS form of the product.
    pub fn identifier(&self) -> String {
        self.bundle_settings
            .identifier
            .clone()
            .unwrap_or_else(|| format!("io.{}.app", self.product_name().to_lowercase()))
    }

    /// Returns the publisher, falling back to the first author.
    pub fn publisher(&self) -> String {
        self.bundle_settings
            .publisher
            .clone()
            .or_else(|| {
                self.package
                    .authors
                    .as_ref()
                    .and_then(|a| a.first())
                    .map(|a| a.split('<').next().unwrap_or(a).trim().to_string())
            })
            .unwrap_or_else(|| "Unknown Publisher".to_string())
    }

    /// Returns the maintainer line for Debian control files.
    pub fn maintainer(&self) -> String {
        self.package
            .authors
            .as_ref()
            .and_then(|a| a.first())
            .cloned()
            .unwrap_or_else(|| self.publisher())
    }

    /// Returns the package homepage URL.
    pub fn homepage(&self) -> Option<&str> {
        self.package.homepage.as_deref()
    }

    /// Returns the package license.
    pub fn license(&self) -> Option<&str> {
        self.package.license.as_deref()
    }

    /// Returns the package authors.
    pub fn authors(&self) -> Option<&[String]> {
        self.package.authors.as_deref()
    }

    /// Returns the source repository URL.
    pub fn repository(&self) -> Option<&str> {
        self.package.repository.as_deref()
    }

    /// Returns the project directory.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Returns the Cargo target directory.
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Returns the root working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Returns the output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Whether the builder is skipped.
    pub fn skip_build(&self) -> bool {
        self.skip_build
    }

    /// Whether staged bundles are kept after packaging.
    pub fn keep_work(&self) -> bool {
        self.keep_work
    }

    /// Returns the notarization timeout.
    pub fn notarization_timeout(&self) -> Duration {
        self.notarization_timeout
    }

    /// Returns the tool set.
    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Returns the macOS credentials, if configured.
    pub fn mac_credentials(&self) -> Option<&MacCredentials> {
        self.mac_credentials.as_ref()
    }

    /// Returns the bundle settings.
    pub fn bundle_settings(&self) -> &BundleSettings {
        &self.bundle_settings
    }

    /// Returns the icon source directory.
    pub fn icons_dir(&self) -> PathBuf {
        self.bundle_settings
            .icons
            .clone()
            .unwrap_or_else(|| self.project_dir.join("assets").join("icons"))
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        package: PackageSettings,
        version: ReleaseVersion,
        bundle_settings: BundleSettings,
        project_dir: PathBuf,
        target_dir: PathBuf,
        work_dir: PathBuf,
        output_dir: PathBuf,
        skip_build: bool,
        keep_work: bool,
        notarization_timeout: Duration,
        tools: ToolSet,
        mac_credentials: Option<MacCredentials>,
    ) -> Self {
        Self {
            package,
            version,
            bundle_settings,
            project_dir,
            target_dir,
            work_dir,
            output_dir,
            skip_build,
            keep_work,
            notarization_timeout,
            tools,
            mac_credentials,
        }
    }
}
