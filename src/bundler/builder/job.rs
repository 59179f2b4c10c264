//! One target job: build, stage, package, collect.

use crate::bundler::{
    BuildTarget, BundleName, OperatingSystem, Settings,
    collector::{self, BundledArtifact},
    error::{Context, Error, Result},
    platform::{PackageContext, PlatformPackager, Workspace},
    resources::icons,
    utils::process::path_arg,
};
use std::path::{Path, PathBuf};

/// What a successful job hands to the fan-in.
#[derive(Clone, Debug, Default)]
pub struct JobOutput {
    /// Collected packages
    pub packages: Vec<BundledArtifact>,
    /// Aggregation warnings
    pub warnings: Vec<String>,
}

/// Runs the whole job for `target`.
pub async fn run_target(settings: &Settings, target: &BuildTarget) -> Result<JobOutput> {
    let bundle_name = BundleName::new(settings.product_name(), settings.version(), target);
    log::info!("Packaging {} as {}", target, bundle_name);

    let workspace = Workspace::create(settings.work_dir(), &bundle_name).await?;

    let artifact = build_artifact(settings, target).await?;
    let mut warnings = Vec::new();
    if let Some(warning) = sniff_object_format(&artifact, target.os).await {
        log::warn!("{}", warning);
        warnings.push(warning);
    }

    let icon_set = icons::load_icon_set(&settings.icons_dir()).await?;

    let ctx = PackageContext {
        settings,
        target,
        bundle_name: &bundle_name,
        workspace: &workspace,
        artifact: &artifact,
        icons: &icon_set,
    };
    let packager = PlatformPackager::for_target(target);
    let staged = packager.stage(&ctx).await.context("staging bundle")?;
    let output = packager.package(&ctx, &staged).await?;
    warnings.extend(output.warnings);

    let packages = collector::collect(&workspace, &bundle_name, target).await?;
    if packages.is_empty() {
        return Err(Error::GenericError(format!(
            "no packages found in {}",
            workspace.out().display()
        )));
    }

    if !settings.keep_work() {
        workspace.discard_intermediates().await?;
    }

    log::info!("✓ {} produced {} package(s)", target, packages.len());
    Ok(JobOutput { packages, warnings })
}

/// Path of the compiled binary for `target`.
pub fn artifact_path(settings: &Settings, target: &BuildTarget) -> PathBuf {
    settings
        .target_dir()
        .join(&target.triple)
        .join("release")
        .join(format!("{}{}", settings.binary_name(), target.os.exe_suffix()))
}

/// Compiles the binary (unless builds are skipped) and checks it exists.
async fn build_artifact(settings: &Settings, target: &BuildTarget) -> Result<PathBuf> {
    if !settings.skip_build() {
        log::info!("Building {} for {}", settings.binary_name(), target.triple);
        settings
            .tools()
            .run_in(
                "cargo",
                settings.project_dir(),
                [
                    "build",
                    "--release",
                    "--target",
                    target.triple.as_str(),
                    "--bin",
                    settings.binary_name(),
                    "--target-dir",
                    path_arg(settings.target_dir())?,
                ],
            )
            .await
            .with_context(|| format!("compiling {}", target.triple))?;
    }

    let path = artifact_path(settings, target);
    if !path.is_file() {
        return Err(Error::MissingArtifact {
            target: target.triple.clone(),
            path,
        });
    }
    log::debug!("Artifact for {}: {}", target, path.display());
    Ok(path)
}

/// Checks the artifact's object format against the target OS.
///
/// Returns a warning on mismatch or when the format cannot be determined.
async fn sniff_object_format(artifact: &Path, os: OperatingSystem) -> Option<String> {
    let bytes = match tokio::fs::read(artifact).await {
        Ok(bytes) => bytes,
        Err(e) => return Some(format!("could not read {}: {}", artifact.display(), e)),
    };

    let detected = match goblin::Object::parse(&bytes) {
        Ok(goblin::Object::Elf(_)) => OperatingSystem::Linux,
        Ok(goblin::Object::Mach(_)) => OperatingSystem::Darwin,
        Ok(goblin::Object::PE(_)) => OperatingSystem::Windows,
        _ => {
            return Some(format!(
                "could not determine the object format of {}",
                artifact.display()
            ));
        }
    };

    (detected != os).then(|| {
        format!(
            "{} looks like a {} binary, expected {}",
            artifact.display(),
            detected,
            os
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{platform::test_support, target::default_matrix};

    #[tokio::test]
    async fn missing_artifact_is_missing_input() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = test_support::builder(tmp.path())
            .skip_build(true)
            .build()
            .unwrap();
        let err = build_artifact(&settings, &default_matrix()[0])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::bundler::FailureKind::MissingInput);
    }

    #[test]
    fn artifact_path_follows_cargo_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = test_support::settings(tmp.path());
        let matrix = default_matrix();
        assert!(
            artifact_path(&settings, &matrix[4])
                .ends_with("target/x86_64-pc-windows-msvc/release/akron.exe")
        );
        assert!(
            artifact_path(&settings, &matrix[1])
                .ends_with("target/aarch64-unknown-linux-gnu/release/akron")
        );
    }

    #[tokio::test]
    async fn unrecognised_object_format_is_a_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("akron");
        std::fs::write(&path, b"#!/bin/sh\necho hi\n").unwrap();
        let warning = sniff_object_format(&path, OperatingSystem::Linux).await;
        assert!(warning.unwrap().contains("could not determine"));
    }
}
