//! Package discovery in a finished job's `out/` directory.
//!
//! Packages are found purely by name: `<bundle_name>.<ext>` for one of the
//! known package extensions. Intermediates never live in `out/`, and a file
//! that merely shares the prefix (`.wixpdb`, another target's name) is
//! ignored.

use crate::bundler::{
    BuildTarget, BundleName, PackageType,
    builder::calculate_sha256,
    error::{Error, ErrorExt, Result},
    platform::Workspace,
};
use std::path::PathBuf;

/// A package file ready for publishing.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BundledArtifact {
    /// Kind of package
    pub package_type: PackageType,
    /// File name, `<bundle_name>.<ext>`
    pub name: String,
    /// Location in the job's `out/` directory
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Hex-encoded SHA-256
    pub sha256: String,
    /// Target label, e.g. `linux-amd64`
    pub target: String,
}

/// Collects the packages of one successful job, sorted by file name.
pub async fn collect(
    workspace: &Workspace,
    bundle_name: &BundleName,
    target: &BuildTarget,
) -> Result<Vec<BundledArtifact>> {
    let pattern = workspace
        .out()
        .join(format!("{}.*", glob::Pattern::escape(bundle_name.as_str())));
    let pattern = pattern
        .to_str()
        .ok_or_else(|| Error::GenericError(format!("non-UTF8 output path: {}", pattern.display())))?;

    let mut artifacts = Vec::new();
    for entry in glob::glob(pattern)? {
        let path = entry.map_err(|e| Error::GenericError(format!("reading package entry: {}", e)))?;

        let metadata = tokio::fs::symlink_metadata(&path)
            .await
            .fs_context("reading package metadata", &path)?;
        if !metadata.is_file() {
            log::debug!("Skipping non-regular file {}", path.display());
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let Some(package_type) = PackageType::from_file_name(bundle_name, &name) else {
            log::debug!("Skipping non-package {}", path.display());
            continue;
        };

        let sha256 = calculate_sha256(&path).await?;
        log::debug!("  ✓ Package: {} ({} bytes)", name, metadata.len());
        artifacts.push(BundledArtifact {
            package_type,
            name,
            path,
            size: metadata.len(),
            sha256,
            target: target.label(),
        });
    }

    artifacts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::target::default_matrix;

    #[tokio::test]
    async fn only_named_packages_are_collected() {
        let tmp = tempfile::tempdir().unwrap();
        let version = crate::version::resolve("[package]\nversion = \"1.2.3\"\n", None).unwrap();
        let target = &default_matrix()[4];
        let name = BundleName::new("akron", &version, target);
        let workspace = Workspace::create(tmp.path(), &name).await.unwrap();

        std::fs::write(workspace.package_path(PackageType::Msi), b"msi").unwrap();
        std::fs::write(workspace.package_path(PackageType::Zip), b"zip").unwrap();
        std::fs::write(workspace.out().join("akron-1.2.3-windows-amd64.wixpdb"), b"pdb").unwrap();
        std::fs::write(workspace.out().join("notes.txt"), b"txt").unwrap();

        let artifacts = collect(&workspace, &name, target).await.unwrap();
        let names: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            ["akron-1.2.3-windows-amd64.msi", "akron-1.2.3-windows-amd64.zip"]
        );
        assert_eq!(artifacts[0].package_type, PackageType::Msi);
        assert_eq!(artifacts[0].size, 3);
        assert_eq!(artifacts[0].target, "windows-amd64");
        assert_eq!(artifacts[0].sha256.len(), 64);
    }
}
