//! Bundle configuration shared by all platforms.

use super::{DebianSettings, MacOsSettings, WindowsSettings};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Bundle configuration for all platforms.
///
/// # Configuration
///
/// Add to `Cargo.toml`:
///
/// ```toml
/// [package.metadata.bundle]
/// identifier = "org.akron.app"
/// publisher = "Akron Developers"
/// display_name = "Akron"
/// icons = "assets/icons"
/// category = "Finance"
///
/// [package.metadata.bundle.tools]
/// wix = "/opt/wix/wix"
/// ```
///
/// Relative paths are resolved against the manifest directory when the
/// manifest is loaded.
///
/// # See Also
///
/// - [`DebianSettings`] - Debian/RPM configuration
/// - [`MacOsSettings`] - macOS signing configuration
/// - [`WindowsSettings`] - Windows installer configuration
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct BundleSettings {
    /// Bundle identifier in reverse domain notation.
    ///
    /// Example: "org.akron.app"
    ///
    /// Required for macOS.
    ///
    /// Default: None
    #[serde(default)]
    pub identifier: Option<String>,

    /// Publisher/company name.
    ///
    /// Default: None
    #[serde(default)]
    pub publisher: Option<String>,

    /// Human readable application name.
    ///
    /// Default: None (uses the product name)
    #[serde(default)]
    pub display_name: Option<String>,

    /// Directory holding the source icons.
    ///
    /// Must contain `icon_{N}x{N}.png` for every size in
    /// [`ICON_SIZES`](crate::bundler::resources::icons::ICON_SIZES), and may
    /// contain `icon.svg`.
    ///
    /// Default: None (uses `assets/icons`)
    #[serde(default)]
    pub icons: Option<PathBuf>,

    /// Copyright notice string.
    ///
    /// Default: None
    #[serde(default)]
    pub copyright: Option<String>,

    /// freedesktop.org category for the desktop entry.
    ///
    /// Default: None (uses "Utility")
    #[serde(default)]
    pub category: Option<String>,

    /// Custom `.desktop` template.
    ///
    /// Default: None (built-in template)
    #[serde(default)]
    pub desktop_template: Option<PathBuf>,

    /// Custom release body template.
    ///
    /// Default: None (built-in template)
    #[serde(default)]
    pub release_body_template: Option<PathBuf>,

    /// Debian-specific settings.
    #[serde(default)]
    pub deb: DebianSettings,

    /// macOS-specific settings.
    #[serde(default)]
    pub macos: MacOsSettings,

    /// Windows-specific settings.
    #[serde(default)]
    pub windows: WindowsSettings,

    /// External tool path overrides (tool name -> executable).
    #[serde(default)]
    pub tools: HashMap<String, PathBuf>,
}

impl BundleSettings {
    /// Resolves every relative path in these settings against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        use path_absolutize::Absolutize;

        let resolve = |p: &mut PathBuf| {
            if let Ok(abs) = p.absolutize_from(base) {
                *p = abs.into_owned();
            }
        };
        let resolve_opt = |p: &mut Option<PathBuf>| {
            if let Some(p) = p.as_mut() {
                resolve(p);
            }
        };

        resolve_opt(&mut self.icons);
        resolve_opt(&mut self.desktop_template);
        resolve_opt(&mut self.release_body_template);
        resolve_opt(&mut self.deb.control_template);
        resolve_opt(&mut self.deb.post_install_script);
        resolve_opt(&mut self.deb.post_remove_script);
        resolve_opt(&mut self.macos.entitlements);
        resolve_opt(&mut self.macos.info_plist_template);
        resolve_opt(&mut self.windows.installer_template);
        for path in self.tools.values_mut() {
            // Bare program names stay PATH lookups.
            if path.components().count() > 1 {
                resolve(path);
            }
        }
    }
}
