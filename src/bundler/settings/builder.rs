//! Builder for constructing Settings.

use super::{BundleSettings, PackageSettings, Settings, core::DEFAULT_NOTARIZATION_TIMEOUT};
use crate::bundler::{Error, builder::MacCredentials, utils::process::ToolSet};
use crate::version::ReleaseVersion;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Builder for constructing [`Settings`].
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_matrix::bundler::{SettingsBuilder, PackageSettings};
///
/// # fn example(version: kodegen_bundler_matrix::version::ReleaseVersion) -> kodegen_bundler_matrix::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .project_dir(".")
///     .version(version)
///     .package_settings(PackageSettings {
///         product_name: "akron".into(),
///         binary_name: "akron".into(),
///         ..Default::default()
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    project_dir: Option<PathBuf>,
    package_settings: Option<PackageSettings>,
    version: Option<ReleaseVersion>,
    bundle_settings: BundleSettings,
    target_dir: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    skip_build: bool,
    keep_work: bool,
    notarization_timeout: Option<Duration>,
    tool_overrides: HashMap<String, PathBuf>,
    mac_credentials: Option<MacCredentials>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the project directory (where the manifest lives).
    ///
    /// # Required
    pub fn project_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets package metadata.
    ///
    /// # Required
    pub fn package_settings(mut self, settings: PackageSettings) -> Self {
        self.package_settings = Some(settings);
        self
    }

    /// Sets the resolved release version.
    ///
    /// # Required
    pub fn version(mut self, version: ReleaseVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets bundle configuration.
    ///
    /// Default: Empty [`BundleSettings`]
    pub fn bundle_settings(mut self, settings: BundleSettings) -> Self {
        self.bundle_settings = settings;
        self
    }

    /// Sets the Cargo target directory.
    ///
    /// Default: `<project>/target`
    pub fn target_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.target_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the root working directory.
    ///
    /// Default: `<target_dir>/release-matrix/work`
    pub fn work_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.work_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the output directory.
    ///
    /// Default: `<target_dir>/release-matrix`
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use prebuilt artifacts.
    pub fn skip_build(mut self, skip: bool) -> Self {
        self.skip_build = skip;
        self
    }

    /// Keep staged bundles after packaging.
    pub fn keep_work(mut self, keep: bool) -> Self {
        self.keep_work = keep;
        self
    }

    /// Sets the notarization timeout.
    ///
    /// Default: [`DEFAULT_NOTARIZATION_TIMEOUT`]
    pub fn notarization_timeout(mut self, timeout: Duration) -> Self {
        self.notarization_timeout = Some(timeout);
        self
    }

    /// Pins a tool to an executable. Takes precedence over manifest overrides.
    pub fn tool<P: AsRef<Path>>(mut self, name: impl Into<String>, path: P) -> Self {
        self.tool_overrides
            .insert(name.into(), path.as_ref().to_path_buf());
        self
    }

    /// Sets the macOS credentials.
    pub fn mac_credentials(mut self, credentials: Option<MacCredentials>) -> Self {
        self.mac_credentials = credentials;
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSettings`] if `project_dir`, `package_settings`
    /// or `version` is missing, or the product or binary name is blank.
    pub fn build(self) -> crate::bundler::Result<Settings> {
        let required = |field: &str| Error::InvalidSettings(format!("{field} is required"));
        let project_dir = self.project_dir.ok_or_else(|| required("project_dir"))?;
        let package = self
            .package_settings
            .ok_or_else(|| required("package_settings"))?;
        let version = self.version.ok_or_else(|| required("version"))?;

        for (field, value) in [
            ("product name", &package.product_name),
            ("binary name", &package.binary_name),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidSettings(format!("{field} is empty")));
            }
        }

        let target_dir = self
            .target_dir
            .unwrap_or_else(|| project_dir.join("target"));
        let output_dir = self
            .output_dir
            .unwrap_or_else(|| target_dir.join("release-matrix"));
        let work_dir = self
            .work_dir
            .unwrap_or_else(|| output_dir.join("work"));

        let mut tools = ToolSet::new(self.bundle_settings.tools.clone());
        for (name, path) in self.tool_overrides {
            tools.set(name, path);
        }

        Ok(Settings::new(
            package,
            version,
            self.bundle_settings,
            project_dir,
            target_dir,
            work_dir,
            output_dir,
            self.skip_build,
            self.keep_work,
            self.notarization_timeout
                .unwrap_or(DEFAULT_NOTARIZATION_TIMEOUT),
            tools,
            self.mac_credentials,
        ))
    }
}
