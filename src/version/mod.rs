//! Release version resolution and the tag consistency gate.
//!
//! The manifest is the single source of truth for the release version. When a
//! run is triggered by a version tag, the tag-derived version must match the
//! manifest string byte-for-byte or the pipeline stops before any target runs.

use std::fmt;

/// Errors raised by the version gate. All of them are configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    /// Manifest is not valid TOML
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    /// No usable `version` field
    #[error("manifest declares no version (expected [package] version or [workspace.package] version)")]
    MissingVersion,

    /// Version is not semver
    #[error("manifest version `{version}` is not a semantic version: {reason}")]
    InvalidSemver {
        /// Declared version
        version: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Tag and manifest disagree
    #[error("tag version `{tag}` does not match manifest version `{manifest}`")]
    Mismatch {
        /// Manifest version
        manifest: String,
        /// Version derived from the tag
        tag: String,
    },
}

/// A resolved, immutable release version.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ReleaseVersion {
    raw: String,
    #[serde(skip)]
    parsed: semver::Version,
}

impl ReleaseVersion {
    /// Exact string as declared in the manifest.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed semantic version.
    pub fn semver(&self) -> &semver::Version {
        &self.parsed
    }

    /// `major.minor.patch.0`, the four-component form Windows installers need.
    ///
    /// Pre-release and build metadata are not representable there and are
    /// dropped.
    pub fn four_part(&self) -> String {
        format!(
            "{}.{}.{}.0",
            self.parsed.major, self.parsed.minor, self.parsed.patch
        )
    }

    /// Version as Debian and RPM spell it.
    ///
    /// The pre-release separator becomes `~` so `0.9.0-rc.1` sorts before
    /// `0.9.0`; remaining hyphens become `.` since neither format allows them
    /// in an upstream version without a revision.
    pub fn package_version(&self) -> String {
        let v = &self.parsed;
        let mut out = format!("{}.{}.{}", v.major, v.minor, v.patch);
        if !v.pre.is_empty() {
            out.push('~');
            out.push_str(&v.pre.as_str().replace('-', "."));
        }
        if !v.build.is_empty() {
            out.push('+');
            out.push_str(&v.build.as_str().replace('-', "."));
        }
        out
    }

    /// Git tag name for this version.
    pub fn tag_name(&self) -> String {
        format!("v{}", self.raw)
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Derives the version string carried by a trigger tag.
///
/// Accepts `refs/tags/v1.2.3`, `v1.2.3` or `1.2.3`.
pub fn tag_version(tag: &str) -> &str {
    let tag = tag.strip_prefix("refs/tags/").unwrap_or(tag);
    tag.strip_prefix('v').unwrap_or(tag)
}

/// Reads the declared version out of manifest content.
pub fn manifest_version(manifest: &str) -> Result<String, VersionError> {
    let value: toml::Value = toml::from_str(manifest)?;

    let package_version = value
        .get("package")
        .and_then(|p| p.get("version"))
        .and_then(|v| v.as_str());

    let workspace_version = value
        .get("workspace")
        .and_then(|w| w.get("package"))
        .and_then(|p| p.get("version"))
        .and_then(|v| v.as_str());

    package_version
        .or(workspace_version)
        .map(str::to_string)
        .ok_or(VersionError::MissingVersion)
}

/// Resolves the release version and applies the tag gate.
///
/// `trigger_tag` is present only for tag-triggered runs.
pub fn resolve(manifest: &str, trigger_tag: Option<&str>) -> Result<ReleaseVersion, VersionError> {
    let raw = manifest_version(manifest)?;

    let parsed = semver::Version::parse(&raw).map_err(|e| VersionError::InvalidSemver {
        version: raw.clone(),
        reason: e.to_string(),
    })?;

    if let Some(tag) = trigger_tag {
        let tagged = tag_version(tag);
        if tagged.as_bytes() != raw.as_bytes() {
            return Err(VersionError::Mismatch {
                manifest: raw,
                tag: tagged.to_string(),
            });
        }
        log::info!("✓ Tag {} matches manifest version {}", tag, raw);
    } else {
        log::info!("Manual run: version {} taken from manifest", raw);
    }

    Ok(ReleaseVersion { raw, parsed })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "[package]\nname = \"akron\"\nversion = \"1.2.3\"\n";

    #[test]
    fn matching_tag_proceeds() {
        let v = resolve(MANIFEST, Some("v1.2.3")).unwrap();
        assert_eq!(v.as_str(), "1.2.3");
        assert_eq!(v.four_part(), "1.2.3.0");
        assert_eq!(v.tag_name(), "v1.2.3");
    }

    #[test]
    fn mismatching_tag_is_rejected() {
        let err = resolve(MANIFEST, Some("refs/tags/v1.2.4")).unwrap_err();
        match err {
            VersionError::Mismatch { manifest, tag } => {
                assert_eq!(manifest, "1.2.3");
                assert_eq!(tag, "1.2.4");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn comparison_is_byte_exact() {
        // Semantically equal build metadata still differs as a string.
        let manifest = "[package]\nname = \"akron\"\nversion = \"1.2.3+build.1\"\n";
        assert!(resolve(manifest, Some("v1.2.3")).is_err());
    }

    #[test]
    fn manual_run_uses_manifest() {
        let v = resolve(MANIFEST, None).unwrap();
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn workspace_version_fallback() {
        let manifest = "[workspace.package]\nversion = \"0.9.0-rc.1\"\n\n[package]\nname = \"akron\"\nversion.workspace = true\n";
        let v = resolve(manifest, Some("0.9.0-rc.1")).unwrap();
        assert_eq!(v.as_str(), "0.9.0-rc.1");
        assert_eq!(v.four_part(), "0.9.0.0");
    }

    #[test]
    fn package_version_sorts_prereleases_first() {
        let version = |raw: &str| {
            resolve(&format!("[package]\nversion = \"{raw}\"\n"), None).unwrap()
        };
        assert_eq!(version("1.2.3").package_version(), "1.2.3");
        assert_eq!(version("0.9.0-rc.1").package_version(), "0.9.0~rc.1");
        assert_eq!(version("1.0.0-alpha-2+build-7").package_version(), "1.0.0~alpha.2+build.7");
    }

    #[test]
    fn missing_or_invalid_version() {
        assert!(matches!(
            resolve("[package]\nname = \"akron\"\n", None),
            Err(VersionError::MissingVersion)
        ));
        assert!(matches!(
            resolve("[package]\nversion = \"one\"\n", None),
            Err(VersionError::InvalidSemver { .. })
        ));
    }
}
