//! WiX source generation.
//!
//! Renders the installer template with handlebars and writes it with a UTF-8
//! BOM, which the WiX toolset expects for non-ASCII product names.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    platform::PackageContext,
    template::{self, TemplateData, WIX_TEMPLATE},
    utils::process::path_arg,
};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// The installer's UpgradeCode.
///
/// A configured code is validated; otherwise the code is derived from the
/// bundle identifier, so it stays stable across releases.
pub fn upgrade_code(configured: Option<&str>, identifier: &str) -> Result<String> {
    let code = match configured {
        Some(code) => Uuid::parse_str(code)
            .map_err(|e| Error::InvalidSettings(format!("invalid upgrade code `{code}`: {e}")))?,
        None => Uuid::new_v5(&Uuid::NAMESPACE_DNS, identifier.as_bytes()),
    };
    Ok(code.hyphenated().to_string().to_uppercase())
}

/// Renders `installer.wxs` into `dir` and returns its path.
pub async fn generate_wxs(ctx: &PackageContext<'_>, exe: &Path, ico: &Path, dir: &Path) -> Result<PathBuf> {
    let settings = ctx.settings;
    let windows = &settings.bundle_settings().windows;

    let mut data = TemplateData::for_target(settings, ctx.target, ctx.bundle_name);
    data.insert("fourPartVersion", settings.version().four_part())
        .insert(
            "upgradeCode",
            upgrade_code(windows.upgrade_code.as_deref(), &settings.identifier())?,
        )
        .insert("iconSource", path_arg(ico)?)
        .insert("binarySource", path_arg(exe)?);

    let rendered = template::render(
        "installer.wxs",
        windows.installer_template.as_deref(),
        WIX_TEMPLATE,
        &data,
    )
    .await?;

    let wxs = dir.join("installer.wxs");
    write_utf8_bom(&wxs, &rendered).await?;
    Ok(wxs)
}

/// Writes `content` preceded by a UTF-8 byte order mark.
async fn write_utf8_bom(path: &Path, content: &str) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .fs_context("creating WiX source", path)?;

    file.write_all(&[0xEF, 0xBB, 0xBF])
        .await
        .fs_context("writing UTF-8 BOM", path)?;
    file.write_all(content.as_bytes())
        .await
        .fs_context("writing WiX source", path)?;
    file.flush().await.fs_context("flushing WiX source", path)?;

    Ok(())
}
