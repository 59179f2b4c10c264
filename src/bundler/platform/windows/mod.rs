//! Windows packaging: icon-patched executable, `.zip` and `.msi`.
//!
//! Staged layout:
//!
//! ```text
//! <bundle_name>/
//!   <binary>.exe   (icon resource embedded with rcedit)
//! ```

pub mod archive;
pub mod msi;

use crate::bundler::{
    PackageType,
    error::{Context, Result},
    platform::{PackageContext, PackageOutput, StagedBundle},
    resources::icons,
    utils::{fs, process::path_arg},
};

/// Stages the icon-patched executable.
pub async fn stage(ctx: &PackageContext<'_>) -> Result<StagedBundle> {
    let root = ctx.workspace.bundle_dir();
    let exe = root.join(format!(
        "{}{}",
        ctx.settings.binary_name(),
        ctx.target.os.exe_suffix()
    ));
    fs::copy_file(ctx.artifact, &exe).await?;

    let ico = ctx
        .workspace
        .scratch()
        .join(format!("{}.ico", ctx.settings.product_name()));
    icons::build_ico(ctx.icons, &ico).await?;

    ctx.settings
        .tools()
        .run("rcedit", [path_arg(&exe)?, "--set-icon", path_arg(&ico)?])
        .await
        .context("embedding icon resource")?;

    log::info!("✓ Staged {}", root.display());
    Ok(StagedBundle { root, entry: exe })
}

/// Produces `.zip` and `.msi` from the staged bundle.
pub async fn package(ctx: &PackageContext<'_>, staged: &StagedBundle) -> Result<PackageOutput> {
    let zip = archive::create_zip(
        &staged.root,
        ctx.bundle_name.as_str(),
        &ctx.workspace.package_path(PackageType::Zip),
    )
    .await
    .context("creating zip archive")?;

    let msi = msi::bundle_project(ctx, staged)
        .await
        .context("creating Windows installer")?;

    Ok(PackageOutput {
        files: vec![zip, msi],
        warnings: Vec::new(),
    })
}
