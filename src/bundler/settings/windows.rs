//! Windows platform-specific settings.

use std::path::PathBuf;

/// Windows installer (.msi) configuration.
///
/// # Configuration
///
/// Add to `Cargo.toml`:
///
/// ```toml
/// [package.metadata.bundle.windows]
/// upgrade_code = "6f4b9a4e-0a0c-4d52-9a36-bc2f0c1d2e3f"
/// installer_template = "packaging/installer.wxs"
/// ```
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct WindowsSettings {
    /// Stable MSI UpgradeCode GUID.
    ///
    /// Must never change between releases, otherwise upgrades install side by
    /// side.
    ///
    /// Default: None (derived deterministically from the bundle identifier)
    #[serde(default)]
    pub upgrade_code: Option<String>,

    /// Custom WiX source template.
    ///
    /// Default: None (built-in template)
    #[serde(default)]
    pub installer_template: Option<PathBuf>,
}
