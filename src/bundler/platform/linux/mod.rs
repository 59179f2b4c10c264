//! Linux packaging: tarball, Debian package and derived RPM.
//!
//! Staged layout:
//!
//! ```text
//! <bundle_name>/
//!   bin/<binary>
//!   share/applications/<product>.desktop
//!   share/icons/hicolor/<N>x<N>/apps/<product>.png
//!   share/icons/hicolor/scalable/apps/<product>.svg   (if provided)
//! ```

pub mod archive;
pub mod debian;
pub mod freedesktop;
pub mod rpm;

use crate::bundler::{
    PackageType,
    error::{Context, Result},
    platform::{PackageContext, PackageOutput, StagedBundle},
    utils::fs,
};

/// Stages the Linux bundle.
pub async fn stage(ctx: &PackageContext<'_>) -> Result<StagedBundle> {
    let root = ctx.workspace.bundle_dir();
    let binary = root.join("bin").join(ctx.settings.binary_name());

    fs::copy_file(ctx.artifact, &binary).await?;
    fs::set_executable(&binary).await?;

    let share = root.join("share");
    freedesktop::write_desktop_entry(ctx, &share).await?;
    freedesktop::install_icons(ctx, &share).await?;

    log::info!("✓ Staged {}", root.display());
    Ok(StagedBundle { root, entry: binary })
}

/// Produces `.tar.gz`, `.deb` and `.rpm` from the staged bundle.
pub async fn package(ctx: &PackageContext<'_>, staged: &StagedBundle) -> Result<PackageOutput> {
    let mut output = PackageOutput::default();

    let tarball = archive::create_tar_gz(
        &staged.root,
        ctx.bundle_name.as_str(),
        &ctx.workspace.package_path(PackageType::TarGz),
    )
    .await
    .context("creating tarball")?;
    output.files.push(tarball);

    let deb = debian::bundle_project(ctx, staged)
        .await
        .context("creating Debian package")?;

    let conversion = rpm::convert_deb(
        &deb,
        &ctx.workspace.package_path(PackageType::Rpm),
        ctx.settings.license().unwrap_or("Unknown"),
        &ctx.workspace.scratch(),
    )
    .await
    .context("converting Debian package to RPM")?;

    output.files.push(deb);
    output.files.push(conversion.path);
    output.warnings.extend(conversion.warnings);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{
        BundleName,
        platform::{Workspace, test_support},
        resources::icons,
        target::default_matrix,
    };

    #[tokio::test]
    async fn linux_target_produces_three_packages() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = test_support::settings(tmp.path());
        let target = &default_matrix()[1];
        let bundle_name = BundleName::new("akron", settings.version(), target);
        let workspace = Workspace::create(&tmp.path().join("work"), &bundle_name)
            .await
            .unwrap();
        let artifact = test_support::fake_artifact(&tmp.path().join("bin"), "akron");
        let icons = icons::load_icon_set(&settings.icons_dir()).await.unwrap();
        let ctx = PackageContext {
            settings: &settings,
            target,
            bundle_name: &bundle_name,
            workspace: &workspace,
            artifact: &artifact,
            icons: &icons,
        };

        let staged = stage(&ctx).await.unwrap();
        assert!(staged.root.join("bin/akron").is_file());
        assert!(staged.root.join("share/applications/akron.desktop").is_file());
        assert!(
            staged
                .root
                .join("share/icons/hicolor/1024x1024/apps/akron.png")
                .is_file()
        );

        let output = package(&ctx, &staged).await.unwrap();
        let names: Vec<String> = output
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            [
                "akron-1.2.3-linux-arm64.tar.gz",
                "akron-1.2.3-linux-arm64.deb",
                "akron-1.2.3-linux-arm64.rpm"
            ]
        );

        // Maintainer and section have no RPM equivalent.
        assert!(output.warnings.iter().any(|w| w.contains("`Maintainer`")));
        assert!(output.warnings.iter().any(|w| w.contains("`Section`")));
        assert!(!output.warnings.iter().any(|w| w.contains("`Version`")));

        // The .deb is an ar archive with the canonical member order.
        let mut ar = ::ar::Archive::new(std::fs::File::open(&output.files[1]).unwrap());
        let mut members = Vec::new();
        while let Some(entry) = ar.next_entry() {
            members.push(String::from_utf8(entry.unwrap().header().identifier().to_vec()).unwrap());
        }
        assert_eq!(members, ["debian-binary", "control.tar.gz", "data.tar.gz"]);
    }

    #[tokio::test]
    async fn prerelease_packages_carry_tilde_versions() {
        use std::io::Read;

        let tmp = tempfile::tempdir().unwrap();
        let version = crate::version::resolve(
            "[package]\nname = \"akron\"\nversion = \"0.9.0-rc.1\"\n",
            None,
        )
        .unwrap();
        let settings = test_support::builder(tmp.path())
            .version(version)
            .build()
            .unwrap();
        let target = &default_matrix()[0];
        let bundle_name = BundleName::new("akron", settings.version(), target);
        let workspace = Workspace::create(&tmp.path().join("work"), &bundle_name)
            .await
            .unwrap();
        let artifact = test_support::fake_artifact(&tmp.path().join("bin"), "akron");
        let icons = icons::load_icon_set(&settings.icons_dir()).await.unwrap();
        let ctx = PackageContext {
            settings: &settings,
            target,
            bundle_name: &bundle_name,
            workspace: &workspace,
            artifact: &artifact,
            icons: &icons,
        };

        let staged = stage(&ctx).await.unwrap();
        let output = package(&ctx, &staged).await.unwrap();
        assert!(
            output.files[1]
                .to_string_lossy()
                .ends_with("akron-0.9.0-rc.1-linux-amd64.deb")
        );

        let mut ar = ::ar::Archive::new(std::fs::File::open(&output.files[1]).unwrap());
        let mut control = String::new();
        while let Some(entry) = ar.next_entry() {
            let entry = entry.unwrap();
            if entry.header().identifier() != b"control.tar.gz" {
                continue;
            }
            let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(entry));
            for file in tar.entries().unwrap() {
                let mut file = file.unwrap();
                if file.path().unwrap().ends_with("control") {
                    file.read_to_string(&mut control).unwrap();
                }
            }
        }
        assert!(control.contains("Version: 0.9.0~rc.1\n"), "{control}");

        let rpm = ::rpm::Package::open(&output.files[2]).unwrap();
        assert_eq!(rpm.metadata.get_version().unwrap(), "0.9.0~rc.1");
    }
}
