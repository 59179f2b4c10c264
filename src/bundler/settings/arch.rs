//! CPU architecture types and utilities.

/// CPU architecture of a build target.
///
/// The release matrix only ships 64-bit targets. Each packaging format spells
/// the architecture differently, so the mapping lives here rather than in the
/// individual packagers.
///
/// # Examples
///
/// ```
/// use kodegen_bundler_matrix::bundler::Arch;
///
/// assert_eq!(Arch::Amd64.as_str(), "amd64");
/// assert_eq!(Arch::Arm64.rpm_arch(), "aarch64");
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// x86_64 / AMD64
    Amd64,
    /// AArch64 / ARM64 (Apple Silicon, modern ARM servers)
    Arm64,
}

impl Arch {
    /// Name used in bundle names and Debian control files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    /// RPM architecture string.
    pub fn rpm_arch(&self) -> &'static str {
        match self {
            Arch::Amd64 => "x86_64",
            Arch::Arm64 => "aarch64",
        }
    }

    /// WiX `-arch` value.
    pub fn wix_arch(&self) -> &'static str {
        match self {
            Arch::Amd64 => "x64",
            Arch::Arm64 => "arm64",
        }
    }

    /// Maps a Debian architecture name back to an [`Arch`].
    pub fn from_deb(arch: &str) -> Option<Self> {
        match arch {
            "amd64" => Some(Arch::Amd64),
            "arm64" => Some(Arch::Arm64),
            _ => None,
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
