//! Platform packagers.
//!
//! A [`PlatformPackager`] turns one compiled artifact into a staged bundle
//! (`stage`) and the staged bundle into package files (`package`). The set of
//! platforms is closed, so the packagers are an enum rather than trait
//! objects.
//!
//! Each job owns a [`Workspace`] under the run's work directory:
//!
//! ```text
//! <work_dir>/<bundle_name>/
//!   stage/<bundle_name>/   staged bundle
//!   scratch/               intermediates, never collected
//!   out/                   finished packages, collected by file name
//! ```

pub mod linux;
pub mod macos;
pub mod windows;

use crate::bundler::{
    BuildTarget, BundleName, OperatingSystem, Settings,
    error::Result,
    resources::icons::IconSet,
    utils::fs,
};
use std::fmt;
use std::path::{Path, PathBuf};

/// Types of packages the matrix can produce.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageType {
    /// Gzip-compressed tarball of the Linux bundle
    TarGz,
    /// Debian package
    Deb,
    /// RPM package derived from the Debian package
    Rpm,
    /// Signed, notarized and stapled macOS disk image
    Dmg,
    /// Zip archive of the Windows bundle
    Zip,
    /// Windows installer
    Msi,
}

impl PackageType {
    /// File extension, without leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            PackageType::TarGz => "tar.gz",
            PackageType::Deb => "deb",
            PackageType::Rpm => "rpm",
            PackageType::Dmg => "dmg",
            PackageType::Zip => "zip",
            PackageType::Msi => "msi",
        }
    }

    /// Package types produced for an operating system.
    pub fn for_os(os: OperatingSystem) -> &'static [PackageType] {
        match os {
            OperatingSystem::Linux => &[PackageType::TarGz, PackageType::Deb, PackageType::Rpm],
            OperatingSystem::Darwin => &[PackageType::Dmg],
            OperatingSystem::Windows => &[PackageType::Zip, PackageType::Msi],
        }
    }

    /// Package type of `file_name` if it is `<bundle_name>.<ext>` for a known extension.
    pub fn from_file_name(bundle_name: &BundleName, file_name: &str) -> Option<Self> {
        let ext = file_name
            .strip_prefix(bundle_name.as_str())?
            .strip_prefix('.')?;
        [
            PackageType::TarGz,
            PackageType::Deb,
            PackageType::Rpm,
            PackageType::Dmg,
            PackageType::Zip,
            PackageType::Msi,
        ]
        .into_iter()
        .find(|t| t.extension() == ext)
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Job-scoped working area.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
    bundle_name: BundleName,
}

impl Workspace {
    /// Creates a fresh working area for `bundle_name`, erasing leftovers of a previous run.
    pub async fn create(work_dir: &Path, bundle_name: &BundleName) -> Result<Self> {
        let workspace = Self {
            root: work_dir.join(bundle_name.as_str()),
            bundle_name: bundle_name.clone(),
        };
        fs::create_dir_all(&workspace.root, true).await?;
        fs::create_dir_all(&workspace.bundle_dir(), false).await?;
        fs::create_dir_all(&workspace.scratch(), false).await?;
        fs::create_dir_all(&workspace.out(), false).await?;
        Ok(workspace)
    }

    /// Root of this job's area.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the staged bundle.
    pub fn stage(&self) -> PathBuf {
        self.root.join("stage")
    }

    /// The staged bundle root, named after the bundle.
    pub fn bundle_dir(&self) -> PathBuf {
        self.stage().join(self.bundle_name.as_str())
    }

    /// Directory for intermediates.
    pub fn scratch(&self) -> PathBuf {
        self.root.join("scratch")
    }

    /// Directory receiving finished packages.
    pub fn out(&self) -> PathBuf {
        self.root.join("out")
    }

    /// Path of a finished package of the given type.
    pub fn package_path(&self, package_type: PackageType) -> PathBuf {
        self.out()
            .join(self.bundle_name.file_name(package_type.extension()))
    }

    /// Removes everything but the finished packages.
    pub async fn discard_intermediates(&self) -> Result<()> {
        fs::remove_dir_all(&self.stage()).await?;
        fs::remove_dir_all(&self.scratch()).await
    }
}

/// Inputs shared by the staging and packaging steps of one job.
#[derive(Clone, Copy, Debug)]
pub struct PackageContext<'a> {
    /// Run settings
    pub settings: &'a Settings,
    /// Target being packaged
    pub target: &'a BuildTarget,
    /// Bundle name of this target
    pub bundle_name: &'a BundleName,
    /// Job working area
    pub workspace: &'a Workspace,
    /// Compiled binary
    pub artifact: &'a Path,
    /// Validated source icons
    pub icons: &'a IconSet,
}

/// A staged, platform-shaped bundle.
#[derive(Clone, Debug)]
pub struct StagedBundle {
    /// Bundle root (`stage/<bundle_name>`)
    pub root: PathBuf,
    /// Primary entry inside the bundle: the binary, or the `.app` on macOS
    pub entry: PathBuf,
}

/// Result of packaging one bundle.
#[derive(Clone, Debug, Default)]
pub struct PackageOutput {
    /// Package files written to the job's `out/` directory
    pub files: Vec<PathBuf>,
    /// Non-fatal aggregation warnings
    pub warnings: Vec<String>,
}

/// Closed set of platform packagers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlatformPackager {
    /// tar.gz, .deb and .rpm
    Linux,
    /// Signed and notarized .dmg
    Mac,
    /// .zip and .msi
    Windows,
}

impl PlatformPackager {
    /// Packager for a target's operating system.
    pub fn for_target(target: &BuildTarget) -> Self {
        match target.os {
            OperatingSystem::Linux => PlatformPackager::Linux,
            OperatingSystem::Darwin => PlatformPackager::Mac,
            OperatingSystem::Windows => PlatformPackager::Windows,
        }
    }

    /// Assembles the platform-shaped bundle.
    pub async fn stage(&self, ctx: &PackageContext<'_>) -> Result<StagedBundle> {
        match self {
            PlatformPackager::Linux => linux::stage(ctx).await,
            PlatformPackager::Mac => macos::stage(ctx).await,
            PlatformPackager::Windows => windows::stage(ctx).await,
        }
    }

    /// Turns the staged bundle into package files.
    pub async fn package(&self, ctx: &PackageContext<'_>, staged: &StagedBundle) -> Result<PackageOutput> {
        match self {
            PlatformPackager::Linux => linux::package(ctx, staged).await,
            PlatformPackager::Mac => macos::package(ctx, staged).await,
            PlatformPackager::Windows => windows::package(ctx, staged).await,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::target::default_matrix;

    #[test]
    fn package_type_from_file_name_requires_exact_prefix() {
        let version = crate::version::resolve("[package]\nversion = \"1.2.3\"\n", None).unwrap();
        let name = BundleName::new("akron", &version, &default_matrix()[0]);

        assert_eq!(
            PackageType::from_file_name(&name, "akron-1.2.3-linux-amd64.tar.gz"),
            Some(PackageType::TarGz)
        );
        assert_eq!(
            PackageType::from_file_name(&name, "akron-1.2.3-linux-amd64.rpm"),
            Some(PackageType::Rpm)
        );
        assert_eq!(PackageType::from_file_name(&name, "akron-1.2.3-linux-amd64.wixpdb"), None);
        assert_eq!(PackageType::from_file_name(&name, "akron-1.2.3-linux-arm64.deb"), None);
    }

    #[tokio::test]
    async fn workspace_is_fresh_per_run() {
        let tmp = tempfile::tempdir().unwrap();
        let version = crate::version::resolve("[package]\nversion = \"1.2.3\"\n", None).unwrap();
        let name = BundleName::new("akron", &version, &default_matrix()[4]);

        let ws = Workspace::create(tmp.path(), &name).await.unwrap();
        std::fs::write(ws.out().join("stale.zip"), b"old").unwrap();

        let ws = Workspace::create(tmp.path(), &name).await.unwrap();
        assert!(!ws.out().join("stale.zip").exists());
        assert!(ws.bundle_dir().ends_with("stage/akron-1.2.3-windows-amd64"));
        assert_eq!(
            ws.package_path(PackageType::Msi).file_name().unwrap(),
            "akron-1.2.3-windows-amd64.msi"
        );
    }
}
