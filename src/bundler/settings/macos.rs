//! macOS platform-specific settings.

use std::path::PathBuf;

/// macOS application bundle and trust pipeline configuration.
///
/// # Configuration
///
/// Add to `Cargo.toml`:
///
/// ```toml
/// [package.metadata.bundle.macos]
/// minimum_system_version = "11.0"
/// signing_identity = "Developer ID Application: Your Name (TEAMID)"
/// entitlements = "packaging/entitlements.plist"
/// ```
///
/// The signing identity may also come from `APPLE_SIGNING_IDENTITY`; the
/// certificate itself always comes from `APPLE_CERTIFICATE`.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct MacOsSettings {
    /// Minimum macOS version required (LSMinimumSystemVersion).
    ///
    /// Default: None (uses "11.0")
    #[serde(default)]
    pub minimum_system_version: Option<String>,

    /// Code signing identity name.
    ///
    /// Example: "Developer ID Application: Your Name (TEAMID)"
    ///
    /// Default: None (taken from the environment)
    #[serde(default)]
    pub signing_identity: Option<String>,

    /// Path to entitlements.plist for code signing.
    ///
    /// Default: None
    #[serde(default)]
    pub entitlements: Option<PathBuf>,

    /// Custom Info.plist template.
    ///
    /// Default: None (built-in template)
    #[serde(default)]
    pub info_plist_template: Option<PathBuf>,
}
