//! RPM package derived from the Debian package.
//!
//! Conversion reads the finished `.deb` back and re-expresses it as an RPM.
//! It is best effort, with a fixed fidelity contract:
//!
//! | .deb                     | .rpm                                   |
//! |--------------------------|----------------------------------------|
//! | Package                  | Name                                   |
//! | Version                  | Version (release `1`)                  |
//! | Architecture             | Arch (`amd64` -> `x86_64`, `arm64` -> `aarch64`) |
//! | Description              | Summary and description                |
//! | Homepage                 | URL                                    |
//! | data files and modes     | files and modes                        |
//! | preinst/postinst/prerm/postrm | matching scriptlets               |
//!
//! Dependency relations (`Depends`, `Recommends`, ...), `Section`,
//! `Priority` and `Maintainer` have no faithful RPM equivalent and are
//! dropped with a warning. `Installed-Size` is recomputed by the RPM writer.

use super::archive;
use crate::bundler::{
    Arch,
    error::{Error, ErrorExt, Result},
};
use std::{
    io::Read,
    path::{Path, PathBuf},
};

/// Control fields dropped with a warning.
const DROPPED_FIELDS: &[&str] = &[
    "Depends",
    "Pre-Depends",
    "Recommends",
    "Suggests",
    "Conflicts",
    "Breaks",
    "Replaces",
    "Provides",
    "Section",
    "Priority",
    "Maintainer",
];

/// Control fields mapped onto the RPM header or recomputed.
const MAPPED_FIELDS: &[&str] = &[
    "Package",
    "Version",
    "Architecture",
    "Description",
    "Homepage",
    "Installed-Size",
];

/// Result of a `.deb` to `.rpm` conversion.
#[derive(Debug, Default)]
pub struct Conversion {
    /// Written RPM
    pub path: PathBuf,
    /// Fields and entries that could not be carried over
    pub warnings: Vec<String>,
}

/// Parsed contents of a `.deb`.
#[derive(Debug, Default)]
struct DebContents {
    control: Vec<(String, String)>,
    scripts: Vec<(String, String)>,
    data_tar_gz: Vec<u8>,
}

impl DebContents {
    fn field(&self, name: &str) -> Option<&str> {
        self.control
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn script(&self, name: &str) -> Option<&str> {
        self.scripts
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Converts `deb` into an RPM at `dest`.
///
/// `license` fills the RPM license tag, which a `.deb` control file does not
/// carry. `scratch` receives the unpacked payload.
pub async fn convert_deb(deb: &Path, dest: &Path, license: &str, scratch: &Path) -> Result<Conversion> {
    let deb = deb.to_path_buf();
    let dest = dest.to_path_buf();
    let license = license.to_string();
    let scratch = scratch.to_path_buf();

    tokio::task::spawn_blocking(move || convert_deb_blocking(&deb, &dest, &license, &scratch))
        .await
        .map_err(|e| Error::GenericError(format!("rpm conversion task panicked: {}", e)))?
}

fn convert_deb_blocking(deb: &Path, dest: &Path, license: &str, scratch: &Path) -> Result<Conversion> {
    let contents = read_deb(deb)?;
    let mut warnings = Vec::new();

    for (field, _) in &contents.control {
        if DROPPED_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(field)) {
            warnings.push(format!("rpm: dropped control field `{}` (no RPM equivalent)", field));
        } else if !MAPPED_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(field)) {
            warnings.push(format!("rpm: ignored unknown control field `{}`", field));
        }
    }

    let required = |name: &str| {
        contents
            .field(name)
            .ok_or_else(|| Error::GenericError(format!("{} has no `{}` field", deb.display(), name)))
    };
    let name = required("Package")?;
    let version = required("Version")?;
    let deb_arch = required("Architecture")?;
    let arch = Arch::from_deb(deb_arch)
        .ok_or_else(|| Error::ArchError(format!("cannot map Debian architecture `{deb_arch}` to RPM")))?;
    let description = contents.field("Description").unwrap_or_default();
    let summary = description.lines().next().unwrap_or_default();

    let mut builder = rpm::PackageBuilder::new(name, version, license, arch.rpm_arch(), summary)
        .release("1")
        .using_config(rpm::BuildConfig::default().compression(rpm::CompressionType::Gzip));
    if let Some(homepage) = contents.field("Homepage") {
        builder = builder.url(homepage);
    }

    if let Some(body) = contents.script("preinst") {
        builder = builder.pre_install_script(body.to_string());
    }
    if let Some(body) = contents.script("postinst") {
        builder = builder.post_install_script(body.to_string());
    }
    if let Some(body) = contents.script("prerm") {
        builder = builder.pre_uninstall_script(body.to_string());
    }
    if let Some(body) = contents.script("postrm") {
        builder = builder.post_uninstall_script(body.to_string());
    }

    // Payload
    let root = scratch.join("rpm-root");
    if root.exists() {
        std::fs::remove_dir_all(&root).fs_context("removing directory", &root)?;
    }
    archive::unpack_tar_gz(contents.data_tar_gz.as_slice(), &root)?;

    for entry in walkdir::WalkDir::new(&root).sort_by_file_name() {
        let entry = entry?;
        let rel = entry.path().strip_prefix(&root)?;
        let install_path = format!("/{}", rel.to_string_lossy().replace('\\', "/"));

        if entry.file_type().is_symlink() {
            warnings.push(format!("rpm: skipped symlink {}", install_path));
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let mode = file_mode(entry.path(), rel)?;
        builder = builder.with_file(
            entry.path(),
            rpm::FileOptions::new(install_path).mode(rpm::FileMode::regular(mode)),
        )?;
    }

    let package = builder.build()?;
    let mut file = std::fs::File::create(dest).fs_context("creating .rpm", dest)?;
    package.write(&mut file)?;

    for warning in &warnings {
        log::warn!("{}", warning);
    }
    log::info!("✓ Created {}", dest.display());

    Ok(Conversion {
        path: dest.to_path_buf(),
        warnings,
    })
}

#[cfg(unix)]
fn file_mode(path: &Path, _rel: &Path) -> Result<u16> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)
        .fs_context("reading metadata of", path)?
        .permissions()
        .mode();
    Ok((mode & 0o7777) as u16)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path, rel: &Path) -> Result<u16> {
    Ok(if rel.starts_with("usr/bin") { 0o755 } else { 0o644 })
}

/// Splits a `.deb` into control fields, maintainer scripts and the data payload.
fn read_deb(path: &Path) -> Result<DebContents> {
    let file = std::fs::File::open(path).fs_context("opening .deb", path)?;
    let mut ar = ar::Archive::new(file);
    let mut contents = DebContents::default();

    while let Some(entry) = ar.next_entry() {
        let mut entry = entry.fs_context("reading .deb member of", path)?;
        let id = String::from_utf8_lossy(entry.header().identifier()).into_owned();
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .fs_context("reading .deb member of", path)?;

        match id.as_str() {
            "control.tar.gz" => read_control_archive(&bytes, &mut contents, path)?,
            "data.tar.gz" => contents.data_tar_gz = bytes,
            _ => {}
        }
    }

    if contents.control.is_empty() {
        crate::bail!("{} has no control file", path.display());
    }
    Ok(contents)
}

fn read_control_archive(bytes: &[u8], contents: &mut DebContents, deb: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes));
    for entry in archive.entries().fs_context("reading control archive of", deb)? {
        let mut entry = entry.fs_context("reading control archive of", deb)?;
        let name = entry
            .path()
            .fs_context("reading control archive of", deb)?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut text = String::new();
        match name.as_str() {
            "control" => {
                entry
                    .read_to_string(&mut text)
                    .fs_context("reading control file of", deb)?;
                contents.control = parse_control(&text);
            }
            "preinst" | "postinst" | "prerm" | "postrm" => {
                entry
                    .read_to_string(&mut text)
                    .fs_context("reading maintainer script of", deb)?;
                contents.scripts.push((name, text));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Parses deb822 fields, joining continuation lines.
fn parse_control(text: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = fields.last_mut() {
                value.push('\n');
                value.push_str(line.trim());
            }
        } else if let Some((key, value)) = line.split_once(':') {
            fields.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    fields
}
