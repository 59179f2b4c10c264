//! Text templates for generated packaging files.
//!
//! Every generated descriptor (desktop entry, Debian control file,
//! Info.plist, WiX source, release body) is rendered with handlebars from a
//! built-in default that the manifest can replace with its own file. HTML
//! escaping is disabled; values are inserted verbatim.

use crate::bundler::{
    BuildTarget, BundleName, Settings,
    error::{Error, ErrorExt, Result},
};
use handlebars::Handlebars;
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};

/// freedesktop.org desktop entry.
pub const DESKTOP_TEMPLATE: &str = r#"[Desktop Entry]
Type=Application
Version=1.0
Name={{displayName}}
Comment={{description}}
Exec={{binaryName}}
Icon={{productName}}
Terminal=false
Categories={{category}};
"#;

/// Debian `control` file.
pub const DEBIAN_CONTROL_TEMPLATE: &str = r#"Package: {{packageName}}
Version: {{packageVersion}}
Architecture: {{architecture}}
Maintainer: {{maintainer}}
Installed-Size: {{installedSize}}
{{#if depends}}Depends: {{depends}}
{{/if}}Section: {{section}}
Priority: {{priority}}
{{#if homepage}}Homepage: {{homepage}}
{{/if}}Description: {{description}}
"#;

/// macOS `Info.plist`.
pub const INFO_PLIST_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleDevelopmentRegion</key>
    <string>English</string>
    <key>CFBundleDisplayName</key>
    <string>{{displayName}}</string>
    <key>CFBundleExecutable</key>
    <string>{{binaryName}}</string>
    <key>CFBundleIconFile</key>
    <string>{{productName}}.icns</string>
    <key>CFBundleIdentifier</key>
    <string>{{identifier}}</string>
    <key>CFBundleInfoDictionaryVersion</key>
    <string>6.0</string>
    <key>CFBundleName</key>
    <string>{{displayName}}</string>
    <key>CFBundlePackageType</key>
    <string>APPL</string>
    <key>CFBundleShortVersionString</key>
    <string>{{version}}</string>
    <key>CFBundleVersion</key>
    <string>{{version}}</string>
    <key>LSMinimumSystemVersion</key>
    <string>{{minimumSystemVersion}}</string>
    <key>NSHighResolutionCapable</key>
    <true/>
{{#if copyright}}    <key>NSHumanReadableCopyright</key>
    <string>{{copyright}}</string>
{{/if}}</dict>
</plist>
"#;

/// WiX v4 installer source.
pub const WIX_TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Wix xmlns="http://wixtoolset.org/schemas/v4/wxs">
  <Package Name="{{displayName}}"
           Manufacturer="{{publisher}}"
           Version="{{fourPartVersion}}"
           UpgradeCode="{{upgradeCode}}"
           Scope="perMachine">
    <MajorUpgrade DowngradeErrorMessage="A newer version of {{displayName}} is already installed." />
    <MediaTemplate EmbedCab="yes" />

    <Property Id="BUNDLENAME" Value="{{bundleName}}" />
    <Icon Id="ProductIcon" SourceFile="{{iconSource}}" />
    <Property Id="ARPPRODUCTICON" Value="ProductIcon" />

    <StandardDirectory Id="ProgramFiles64Folder">
      <Directory Id="INSTALLFOLDER" Name="{{displayName}}">
        <Component Id="MainExecutable" Guid="*">
          <File Id="MainExe" Source="{{binarySource}}" KeyPath="yes" />
        </Component>
      </Directory>
    </StandardDirectory>

    <StandardDirectory Id="ProgramMenuFolder">
      <Component Id="StartMenuShortcut" Guid="*">
        <Shortcut Id="AppShortcut"
                  Name="{{displayName}}"
                  Target="[INSTALLFOLDER]{{binaryName}}.exe"
                  WorkingDirectory="INSTALLFOLDER" />
        <RegistryValue Root="HKCU" Key="Software\[Manufacturer]\[ProductName]" Name="installed" Type="integer" Value="1" KeyPath="yes" />
      </Component>
    </StandardDirectory>

    <Feature Id="Main" Title="{{displayName}}">
      <ComponentRef Id="MainExecutable" />
      <ComponentRef Id="StartMenuShortcut" />
    </Feature>
  </Package>
</Wix>
"#;

/// Release display text.
pub const RELEASE_BODY_TEMPLATE: &str = r#"## {{productName}} {{version}}

{{#if draft}}Development build of {{productName}} {{version}}. Not for general distribution.{{else}}{{productName}} {{version}} release packages.{{/if}}

| Package | Target | SHA-256 |
|---|---|---|
{{#each assets}}| `{{name}}` | {{target}} | `{{sha256}}` |
{{/each}}"#;

/// Values exposed to a template.
///
/// Keys are camelCase (`version`, `packageVersion`, `bundleName`, `architecture`,
/// `operatingSystem`, ...). Values may be any JSON value so templates can use
/// `#if` and `#each`.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct TemplateData(BTreeMap<String, serde_json::Value>);

impl TemplateData {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context shared by every per-target template.
    pub fn for_target(settings: &Settings, target: &BuildTarget, bundle_name: &BundleName) -> Self {
        let mut data = Self::new();
        data.insert("version", settings.version_string())
            .insert("packageVersion", settings.version().package_version())
            .insert("bundleName", bundle_name.as_str())
            .insert("architecture", target.arch.as_str())
            .insert("operatingSystem", target.os.as_str())
            .insert("productName", settings.product_name())
            .insert("displayName", settings.display_name())
            .insert("binaryName", settings.binary_name())
            .insert("identifier", settings.identifier())
            .insert("publisher", settings.publisher())
            .insert("description", settings.description());
        data
    }

    /// Inserts or replaces one value.
    pub fn insert(&mut self, key: &str, value: impl Into<serde_json::Value>) -> &mut Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Inserts a value only if present.
    pub fn insert_opt<V: Into<serde_json::Value>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.insert(key, value);
        }
        self
    }
}

/// Renders `builtin`, or the file at `custom` when one is configured.
///
/// A configured template that does not exist is a missing input, not a
/// reason to fall back to the default.
pub async fn render(
    name: &str,
    custom: Option<&Path>,
    builtin: &str,
    data: &TemplateData,
) -> Result<String> {
    let source = match custom {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::MissingTemplate(path.to_path_buf()));
            }
            tokio::fs::read_to_string(path)
                .await
                .fs_context("reading template", path)?
        }
        None => builtin.to_string(),
    };

    render_str(name, &source, data)
}

/// Renders a template source string.
pub fn render_str(name: &str, source: &str, data: &impl Serialize) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string(name, source)
        .map_err(|e| Error::Template {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

    handlebars.render(name, data).map_err(|e| Error::Template {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
