//! Release target matrix and deterministic bundle naming.

use super::settings::Arch;
use crate::version::ReleaseVersion;
use std::fmt;

/// Operating system of a build target.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    /// Linux (tarball, .deb, .rpm)
    Linux,
    /// macOS (signed and notarized .dmg)
    Darwin,
    /// Windows (.zip, .msi)
    Windows,
}

impl OperatingSystem {
    /// Name used in bundle names.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::Linux => "linux",
            OperatingSystem::Darwin => "darwin",
            OperatingSystem::Windows => "windows",
        }
    }

    /// Executable suffix produced by the toolchain for this OS.
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => ".exe",
            _ => "",
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the release matrix.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BuildTarget {
    /// Operating system
    pub os: OperatingSystem,
    /// CPU architecture
    pub arch: Arch,
    /// Rust toolchain triple used by the builder
    pub triple: String,
}

impl BuildTarget {
    /// Creates a target from its parts.
    pub fn new(os: OperatingSystem, arch: Arch, triple: impl Into<String>) -> Self {
        Self {
            os,
            arch,
            triple: triple.into(),
        }
    }

    /// Short `{os}-{arch}` label, used by `--target` filters and status output.
    pub fn label(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.triple)
    }
}

/// The fixed release matrix.
pub fn default_matrix() -> Vec<BuildTarget> {
    vec![
        BuildTarget::new(OperatingSystem::Linux, Arch::Amd64, "x86_64-unknown-linux-gnu"),
        BuildTarget::new(OperatingSystem::Linux, Arch::Arm64, "aarch64-unknown-linux-gnu"),
        BuildTarget::new(OperatingSystem::Darwin, Arch::Amd64, "x86_64-apple-darwin"),
        BuildTarget::new(OperatingSystem::Darwin, Arch::Arm64, "aarch64-apple-darwin"),
        BuildTarget::new(OperatingSystem::Windows, Arch::Amd64, "x86_64-pc-windows-msvc"),
    ]
}

/// Restricts the matrix to the given `{os}-{arch}` labels.
///
/// An empty filter keeps the whole matrix. Unknown labels are returned as the
/// error value so the CLI can reject them before anything runs.
pub fn filter_matrix(
    matrix: Vec<BuildTarget>,
    labels: &[String],
) -> std::result::Result<Vec<BuildTarget>, Vec<String>> {
    if labels.is_empty() {
        return Ok(matrix);
    }

    let unknown: Vec<String> = labels
        .iter()
        .filter(|l| !matrix.iter().any(|t| &t.label() == *l))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(unknown);
    }

    Ok(matrix
        .into_iter()
        .filter(|t| labels.contains(&t.label()))
        .collect())
}

/// Deterministic `{product}-{version}-{os}-{arch}` identifier.
///
/// Used as the staged bundle's root directory name and as the base name of
/// every package file derived from it.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct BundleName(String);

impl BundleName {
    /// Computes the name for one target of one release.
    pub fn new(product: &str, version: &ReleaseVersion, target: &BuildTarget) -> Self {
        Self(format!(
            "{}-{}-{}-{}",
            product,
            version.as_str(),
            target.os.as_str(),
            target.arch.as_str()
        ))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Package file name with the given extension (without leading dot).
    pub fn file_name(&self, ext: &str) -> String {
        format!("{}.{}", self.0, ext)
    }
}

impl fmt::Display for BundleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
