//! Filesystem release store.
//!
//! ```text
//! <root>/releases/<version>/
//!   release.json
//!   SHA256SUMS
//!   <asset>...
//! ```

use super::{PublishError, ReleaseRecord};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Publishes releases into a directory tree.
#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Store rooted at `root` (usually the output directory).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory of one version's release.
    pub fn release_dir(&self, version: &str) -> PathBuf {
        self.root.join("releases").join(version)
    }

    /// Writes the release into a sibling directory, then swaps it in place of
    /// any previous publication of the same version.
    pub async fn publish(&self, record: &ReleaseRecord) -> Result<String, PublishError> {
        let dest = self.release_dir(&record.version);
        let partial = self
            .root
            .join("releases")
            .join(format!(".{}.partial", record.version));

        remove_if_exists(&partial).await?;
        fs::create_dir_all(&partial)
            .await
            .map_err(io("creating release directory", &partial))?;

        for asset in &record.assets {
            let to = partial.join(&asset.name);
            fs::copy(&asset.source, &to)
                .await
                .map_err(io("copying release asset", &asset.source))?;
            log::debug!("Stored {}", asset.name);
        }

        let sums = partial.join("SHA256SUMS");
        fs::write(&sums, record.checksums())
            .await
            .map_err(io("writing", &sums))?;

        let manifest = partial.join("release.json");
        fs::write(&manifest, serde_json::to_vec_pretty(record)?)
            .await
            .map_err(io("writing", &manifest))?;

        remove_if_exists(&dest).await?;
        fs::rename(&partial, &dest)
            .await
            .map_err(io("moving release into", &dest))?;

        Ok(dest.display().to_string())
    }
}

async fn remove_if_exists(dir: &Path) -> Result<(), PublishError> {
    if fs::try_exists(dir).await.unwrap_or(false) {
        fs::remove_dir_all(dir)
            .await
            .map_err(io("removing previous release", dir))?;
    }
    Ok(())
}

fn io(context: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> PublishError {
    let path = path.to_path_buf();
    move |source| PublishError::Io {
        context,
        path,
        source,
    }
}
