//! Debian package (.deb) creation.
//!
//! A `.deb` is an `ar` archive with three members, in this order:
//!
//! - `debian-binary`: format version `2.0`
//! - `control.tar.gz`: control file, md5sums and maintainer scripts
//! - `data.tar.gz`: the installed files
//!
//! The staged bundle is copied under `usr/` of the package root, so
//! `bin/<binary>` installs as `/usr/bin/<binary>`.

use super::archive;
use crate::bundler::{
    error::{Error, ErrorExt, Result},
    platform::{PackageContext, StagedBundle},
    template::{self, DEBIAN_CONTROL_TEMPLATE, TemplateData},
    utils::fs,
};
use flate2::{Compression, write::GzEncoder};
use std::path::{Path, PathBuf};

/// Post-install hook used when none is configured.
const DEFAULT_POSTINST: &str = r#"#!/bin/sh
set -e
if command -v update-desktop-database >/dev/null 2>&1; then
    update-desktop-database -q /usr/share/applications || true
fi
if command -v gtk-update-icon-cache >/dev/null 2>&1; then
    gtk-update-icon-cache -q -t -f /usr/share/icons/hicolor || true
fi
"#;

/// Post-removal hook used when none is configured.
const DEFAULT_POSTRM: &str = DEFAULT_POSTINST;

/// Builds `<bundle_name>.deb` in the job's output directory.
pub async fn bundle_project(ctx: &PackageContext<'_>, staged: &StagedBundle) -> Result<PathBuf> {
    let settings = ctx.settings;
    log::info!("Building .deb for {}", ctx.bundle_name);

    let package_dir = ctx.workspace.scratch().join("deb");
    let data_dir = package_dir.join("data");
    let control_dir = package_dir.join("control");
    fs::create_dir_all(&package_dir, true).await?;
    fs::create_dir_all(&control_dir, false).await?;

    fs::copy_dir(&staged.root, &data_dir.join("usr")).await?;

    // Control file
    let installed_size = installed_size_kib(&data_dir).await?;
    let deb = &settings.bundle_settings().deb;

    let mut data = TemplateData::for_target(settings, ctx.target, ctx.bundle_name);
    data.insert("packageName", debian_package_name(settings.product_name()))
        .insert("maintainer", settings.maintainer())
        .insert("installedSize", installed_size)
        .insert("section", deb.section.as_deref().unwrap_or("utils"))
        .insert("priority", deb.priority.as_deref().unwrap_or("optional"))
        .insert_opt("homepage", settings.homepage())
        .insert_opt("depends", deb.depends.as_ref().map(|d| d.join(", ")));

    let control = template::render(
        "control",
        deb.control_template.as_deref(),
        DEBIAN_CONTROL_TEMPLATE,
        &data,
    )
    .await?;
    fs::write_file(&control_dir.join("control"), ensure_trailing_newline(control)).await?;

    // md5sums
    let md5sums = generate_md5sums(&data_dir).await?;
    fs::write_file(&control_dir.join("md5sums"), md5sums).await?;

    // Maintainer scripts, copied verbatim
    write_script(&control_dir.join("postinst"), deb.post_install_script.as_deref(), DEFAULT_POSTINST).await?;
    write_script(&control_dir.join("postrm"), deb.post_remove_script.as_deref(), DEFAULT_POSTRM).await?;

    let deb_path = ctx.workspace.package_path(crate::bundler::PackageType::Deb);
    create_deb_archive(&control_dir, &data_dir, &deb_path).await?;

    log::info!("✓ Created {}", deb_path.display());
    Ok(deb_path)
}

/// Debian package names are lowercase and may not contain underscores.
pub fn debian_package_name(product: &str) -> String {
    product.to_lowercase().replace('_', "-")
}

fn ensure_trailing_newline(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

async fn write_script(dest: &Path, configured: Option<&Path>, builtin: &str) -> Result<()> {
    match configured {
        Some(src) => {
            if !src.is_file() {
                return Err(Error::MissingTemplate(src.to_path_buf()));
            }
            fs::copy_file(src, dest).await?;
        }
        None => fs::write_file(dest, builtin).await?,
    }
    fs::set_executable(dest).await
}

/// Total size of the installed files in KiB, rounded up.
async fn installed_size_kib(data_dir: &Path) -> Result<u64> {
    let data_dir = data_dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<u64> {
        let mut total = 0u64;
        for entry in walkdir::WalkDir::new(&data_dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                total += entry
                    .metadata()
                    .map_err(|e| Error::GenericError(e.to_string()))?
                    .len();
            }
        }
        Ok(total.div_ceil(1024))
    })
    .await
    .map_err(|e| Error::GenericError(format!("Size calculation task panicked: {}", e)))?
}

/// One `<md5>  <relative path>` line per installed file, sorted by path.
async fn generate_md5sums(data_dir: &Path) -> Result<String> {
    let data_dir = data_dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<String> {
        let mut lines = Vec::new();
        for entry in walkdir::WalkDir::new(&data_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let bytes = std::fs::read(entry.path()).fs_context("reading", entry.path())?;
            let rel = entry.path().strip_prefix(&data_dir)?;
            lines.push(format!(
                "{:x}  {}\n",
                md5::compute(&bytes),
                rel.to_string_lossy().replace('\\', "/")
            ));
        }
        Ok(lines.concat())
    })
    .await
    .map_err(|e| Error::GenericError(format!("md5sums task panicked: {}", e)))?
}

/// Assembles the ar archive from the control and data trees.
async fn create_deb_archive(control_dir: &Path, data_dir: &Path, dest: &Path) -> Result<()> {
    let control_dir = control_dir.to_path_buf();
    let data_dir = data_dir.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let control_tar = archive::tar_dir(
            GzEncoder::new(Vec::new(), Compression::default()),
            &control_dir,
            ".",
        )?
        .finish()
        .fs_context("compressing control archive", &control_dir)?;

        let data_tar = archive::tar_dir(
            GzEncoder::new(Vec::new(), Compression::default()),
            &data_dir,
            ".",
        )?
        .finish()
        .fs_context("compressing data archive", &data_dir)?;

        let file = std::fs::File::create(&dest).fs_context("creating .deb", &dest)?;
        let mut ar = ar::Builder::new(file);
        for (name, bytes) in [
            ("debian-binary", b"2.0\n".to_vec()),
            ("control.tar.gz", control_tar),
            ("data.tar.gz", data_tar),
        ] {
            let mut header = ar::Header::new(name.as_bytes().to_vec(), bytes.len() as u64);
            header.set_mode(0o100644);
            ar.append(&header, bytes.as_slice())
                .fs_context("writing .deb member", &dest)?;
        }
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!(".deb task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_names_are_debian_safe() {
        assert_eq!(debian_package_name("Akron_GUI"), "akron-gui");
    }
}
