//! Installer compilation with `wix build`.

use crate::bundler::{
    error::{ErrorExt, Result},
    settings::Arch,
    utils::{
        fs,
        process::{ToolSet, path_arg},
    },
};
use std::path::Path;

/// Compiles `wxs` into `msi` for `arch`.
pub async fn run_wix(tools: &ToolSet, arch: Arch, wxs: &Path, msi: &Path) -> Result<()> {
    log::info!("Running wix build...");

    tools
        .run(
            "wix",
            [
                "build",
                "-arch",
                arch.wix_arch(),
                "-o",
                path_arg(msi)?,
                path_arg(wxs)?,
            ],
        )
        .await?;

    Ok(())
}

/// Removes the non-distributable intermediates and moves `built` to `dest`.
pub async fn finalize(wxs: &Path, built: &Path, dest: &Path) -> Result<()> {
    fs::remove_file(&built.with_extension("wixpdb")).await?;
    fs::remove_file(wxs).await?;

    fs::remove_file(dest).await?;
    tokio::fs::rename(built, dest)
        .await
        .fs_context("moving installer to", dest)?;
    Ok(())
}
