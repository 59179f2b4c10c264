//! Windows installer (.msi) built with the WiX toolset.
//!
//! # Module Organization
//!
//! - `script` - WiX source generation from the installer template
//! - `build` - `wix build` execution and intermediate cleanup

mod build;
mod script;

use crate::bundler::{
    PackageType,
    error::Result,
    platform::{PackageContext, StagedBundle},
    resources::icons,
    utils::fs,
};
use std::path::PathBuf;

pub use script::{generate_wxs, upgrade_code};

/// Builds the installer for the staged executable and returns its path in `out/`.
///
/// # Process
///
/// 1. Build the installer icon from the source icon set
/// 2. Render the WiX source with the four-part version and upgrade code
/// 3. Compile with `wix build`
/// 4. Discard `.wixpdb` and the source, move the `.msi` to `out/`
pub async fn bundle_project(ctx: &PackageContext<'_>, staged: &StagedBundle) -> Result<PathBuf> {
    log::info!("Building installer for {}", ctx.bundle_name);

    let scratch = ctx.workspace.scratch().join("msi");
    fs::create_dir_all(&scratch, true).await?;

    let ico = scratch.join("installer.ico");
    icons::build_ico(ctx.icons, &ico).await?;

    let wxs = script::generate_wxs(ctx, &staged.entry, &ico, &scratch).await?;
    let built = scratch.join(ctx.bundle_name.file_name(PackageType::Msi.extension()));
    build::run_wix(ctx.settings.tools(), ctx.target.arch, &wxs, &built).await?;

    let msi = ctx.workspace.package_path(PackageType::Msi);
    build::finalize(&wxs, &built, &msi).await?;

    log::info!("✓ Created installer {}", msi.display());
    Ok(msi)
}
