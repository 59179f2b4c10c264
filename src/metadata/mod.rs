//! Manifest loading.
//!
//! `Cargo.toml` is read and parsed exactly once. The raw text is kept so the
//! version gate sees the manifest exactly as declared.

use crate::bundler::{BundleSettings, PackageSettings};
use crate::error::{BundlerError, Result};
use std::path::{Path, PathBuf};

/// Everything the pipeline needs from the manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Manifest path
    pub path: PathBuf,
    /// Directory containing the manifest
    pub dir: PathBuf,
    /// Manifest content as read
    pub raw: String,
    /// `[package]` metadata
    pub package: PackageSettings,
    /// `[package.metadata.bundle]`, paths resolved against [`Manifest::dir`]
    pub bundle: BundleSettings,
}

/// Reads and parses `Cargo.toml` at `path`.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    use path_absolutize::Absolutize;

    let path = path.absolutize()?.into_owned();
    let raw = std::fs::read_to_string(&path).map_err(|e| {
        BundlerError::Manifest(format!("failed to read {}: {}", path.display(), e))
    })?;
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| BundlerError::Manifest(format!("invalid manifest path {}", path.display())))?;

    let (package, bundle) = parse_manifest(&raw, &dir)?;
    log::debug!(
        "Loaded manifest {} (product {}, binary {})",
        path.display(),
        package.product_name,
        package.binary_name
    );

    Ok(Manifest {
        path,
        dir,
        raw,
        package,
        bundle,
    })
}

/// Extracts package and bundle settings from manifest content.
fn parse_manifest(raw: &str, dir: &Path) -> Result<(PackageSettings, BundleSettings)> {
    let value: toml::Value = toml::from_str(raw)?;
    let package = value
        .get("package")
        .ok_or_else(|| BundlerError::Manifest("no [package] section".into()))?;

    let string = |key: &str| package.get(key).and_then(|v| v.as_str()).map(String::from);

    let product_name = string("name")
        .ok_or_else(|| BundlerError::Manifest("missing `name` in [package]".into()))?;

    // First [[bin]] entry, falling back to the package name.
    let binary_name = value
        .get("bin")
        .and_then(|v| v.as_array())
        .and_then(|bins| bins.first())
        .and_then(|bin| bin.get("name"))
        .and_then(|v| v.as_str())
        .map(String::from)
        .unwrap_or_else(|| product_name.clone());

    let authors = package.get("authors").and_then(|v| v.as_array()).map(|list| {
        list.iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect()
    });

    let settings = PackageSettings {
        description: string("description").unwrap_or_default(),
        homepage: string("homepage"),
        license: string("license"),
        repository: string("repository"),
        authors,
        binary_name,
        product_name,
    };

    let mut bundle: BundleSettings = match package.get("metadata").and_then(|m| m.get("bundle")) {
        Some(table) => table
            .clone()
            .try_into()
            .map_err(|e| BundlerError::Manifest(format!("invalid [package.metadata.bundle]: {e}")))?,
        None => {
            log::debug!("No [package.metadata.bundle] section, using defaults");
            BundleSettings::default()
        }
    };
    bundle.resolve_paths(dir);

    Ok((settings, bundle))
}
