//! UDRW to UDZO conversion.
//!
//! Layout changes only persist in a read-write image, so the image is laid
//! out first and compressed afterwards.

use crate::bundler::{
    error::{ErrorExt, Result},
    utils::{
        fs,
        process::{ToolSet, path_arg},
    },
};
use std::path::Path;

/// Replaces the read-write image at `dmg` with a compressed read-only one.
pub async fn convert_to_compressed(tools: &ToolSet, dmg: &Path) -> Result<()> {
    let compressed = dmg.with_extension("udzo.dmg");
    fs::remove_file(&compressed).await?;

    tools
        .run(
            "hdiutil",
            [
                "convert",
                path_arg(dmg)?,
                "-format",
                "UDZO",
                "-o",
                path_arg(&compressed)?,
            ],
        )
        .await?;

    fs::remove_file(dmg).await?;
    tokio::fs::rename(&compressed, dmg)
        .await
        .fs_context("replacing disk image", dmg)?;

    log::debug!("Converted {} to UDZO", dmg.display());
    Ok(())
}
