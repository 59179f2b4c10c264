//! Disk image creation with `hdiutil create`.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    utils::{
        fs,
        process::{ToolSet, path_arg},
    },
};
use std::path::Path;

/// Copies `app` into a fresh `staging` directory next to an `Applications`
/// link and returns the app's file name.
pub async fn stage_contents(app: &Path, staging: &Path) -> Result<String> {
    let app_name = app
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::GenericError(format!("invalid app bundle path: {}", app.display())))?
        .to_string();

    fs::create_dir_all(staging, true).await?;
    fs::copy_dir(app, &staging.join(&app_name)).await?;

    let link = staging.join("Applications");
    fs::symlink_dir(Path::new("/Applications"), &link)
        .fs_context("creating Applications link", &link)?;

    Ok(app_name)
}

/// Creates a read-write (UDRW) image of `staging` at `dmg`.
pub async fn create_image(tools: &ToolSet, staging: &Path, volume_name: &str, dmg: &Path) -> Result<()> {
    fs::remove_file(dmg).await?;

    tools
        .run(
            "hdiutil",
            [
                "create",
                "-volname",
                volume_name,
                "-srcfolder",
                path_arg(staging)?,
                "-ov",
                "-format",
                "UDRW",
                path_arg(dmg)?,
            ],
        )
        .await?;

    log::debug!("Created UDRW image {}", dmg.display());
    Ok(())
}
