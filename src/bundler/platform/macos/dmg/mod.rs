//! Drag-to-install disk image.
//!
//! The image is built in the job's scratch directory in three steps:
//!
//! - `creation`: stage the `.app` next to an `Applications` link and create a
//!   read-write (UDRW) image
//! - `customization`: mount it at a job-scoped mountpoint and lay out the
//!   Finder window
//! - `conversion`: convert to compressed read-only (UDZO)
//!
//! The volume name is the bundle name, so concurrent jobs never share a
//! volume or a mountpoint.

mod conversion;
mod creation;
mod customization;

use crate::bundler::{
    error::{Context, Result},
    utils::process::ToolSet,
};
use std::path::{Path, PathBuf};

pub use conversion::convert_to_compressed;
pub use creation::{create_image, stage_contents};
pub use customization::{Layout, apply_layout};

/// An unsigned, compressed disk image.
#[derive(Clone, Debug)]
pub struct DiskImage {
    /// Image path inside the scratch directory
    pub path: PathBuf,
    /// Non-fatal problems, e.g. the window layout could not be applied
    pub warnings: Vec<String>,
}

/// Builds `<scratch>/<volume_name>.dmg` containing `app`.
pub async fn build(tools: &ToolSet, app: &Path, volume_name: &str, scratch: &Path) -> Result<DiskImage> {
    log::info!("Creating disk image {}", volume_name);

    let staging = scratch.join("dmg-staging");
    let path = scratch.join(format!("{volume_name}.dmg"));
    let mountpoint = scratch.join("mnt");

    let app_name = stage_contents(app, &staging)
        .await
        .context("staging disk image contents")?;
    create_image(tools, &staging, volume_name, &path).await?;

    let mut warnings = Vec::new();
    let layout = Layout::new(volume_name, &app_name);
    if let Some(warning) = apply_layout(tools, &path, &mountpoint, &layout).await? {
        warnings.push(warning);
    }

    convert_to_compressed(tools, &path).await?;

    log::info!("✓ Created disk image {}", path.display());
    Ok(DiskImage { path, warnings })
}
