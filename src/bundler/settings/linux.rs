//! Linux platform-specific settings.

use std::path::PathBuf;

/// Debian package (.deb) configuration.
///
/// The `.rpm` is derived from the `.deb`, so these settings drive both
/// installer formats.
///
/// # Configuration
///
/// Add to `Cargo.toml`:
///
/// ```toml
/// [package.metadata.bundle.deb]
/// depends = ["libc6 (>= 2.31)", "libssl3"]
/// section = "net"
/// priority = "optional"
/// post_install_script = "packaging/postinst"
/// ```
///
/// # Dependency Format
///
/// Dependencies follow Debian package syntax:
/// - `package-name` - Any version
/// - `package-name (>= 1.0)` - Minimum version
///
/// # Maintainer Scripts
///
/// `post_install_script` and `post_remove_script` are copied verbatim into the
/// control archive as `postinst` and `postrm`. Without them, built-in hooks
/// refresh the desktop database and icon cache.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct DebianSettings {
    /// Package dependencies in Debian syntax.
    ///
    /// Default: None
    #[serde(default)]
    pub depends: Option<Vec<String>>,

    /// Debian control file section.
    ///
    /// Default: None (uses "utils")
    #[serde(default)]
    pub section: Option<String>,

    /// Package priority in Debian repository.
    ///
    /// Default: None (uses "optional")
    #[serde(default)]
    pub priority: Option<String>,

    /// Custom control file template.
    ///
    /// Default: None (built-in template)
    #[serde(default)]
    pub control_template: Option<PathBuf>,

    /// Post-install script path (postinst).
    ///
    /// Default: None (built-in hook)
    #[serde(default)]
    pub post_install_script: Option<PathBuf>,

    /// Post-remove script path (postrm).
    ///
    /// Default: None (built-in hook)
    #[serde(default)]
    pub post_remove_script: Option<PathBuf>,
}
