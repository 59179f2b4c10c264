//! freedesktop.org integration: desktop entry and hicolor icon theme.

use crate::bundler::{
    error::Result,
    platform::PackageContext,
    template::{self, DESKTOP_TEMPLATE, TemplateData},
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Renders `share/applications/<product>.desktop` under `share_dir`.
pub async fn write_desktop_entry(ctx: &PackageContext<'_>, share_dir: &Path) -> Result<PathBuf> {
    let settings = ctx.settings;

    let mut data = TemplateData::for_target(settings, ctx.target, ctx.bundle_name);
    data.insert(
        "category",
        settings
            .bundle_settings()
            .category
            .as_deref()
            .unwrap_or("Utility"),
    );

    let entry = template::render(
        "desktop",
        settings.bundle_settings().desktop_template.as_deref(),
        DESKTOP_TEMPLATE,
        &data,
    )
    .await?;

    let path = share_dir
        .join("applications")
        .join(format!("{}.desktop", settings.product_name()));
    fs::write_file(&path, entry).await?;
    Ok(path)
}

/// Installs every source icon into `share/icons/hicolor`.
pub async fn install_icons(ctx: &PackageContext<'_>, share_dir: &Path) -> Result<()> {
    let hicolor = share_dir.join("icons").join("hicolor");
    let name = ctx.settings.product_name();

    for icon in ctx.icons.icons() {
        let dest = hicolor
            .join(format!("{0}x{0}", icon.size))
            .join("apps")
            .join(format!("{name}.png"));
        fs::copy_file(&icon.path, &dest).await?;
    }

    if let Some(svg) = ctx.icons.svg() {
        let dest = hicolor
            .join("scalable")
            .join("apps")
            .join(format!("{name}.svg"));
        fs::copy_file(svg, &dest).await?;
    }

    log::debug!(
        "Installed {} icons into {}",
        ctx.icons.icons().len(),
        hicolor.display()
    );
    Ok(())
}
