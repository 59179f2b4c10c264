//! Gzip-compressed tar archives.

use crate::bundler::error::{Error, ErrorExt, Result};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
};

/// Archives `src_dir` into `dest` with every entry under `root_name/`.
pub async fn create_tar_gz(src_dir: &Path, root_name: &str, dest: &Path) -> Result<PathBuf> {
    let src_dir = src_dir.to_path_buf();
    let root_name = root_name.to_string();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let file = std::fs::File::create(&dest).fs_context("creating archive", &dest)?;
        let encoder = tar_dir(GzEncoder::new(file, Compression::default()), &src_dir, &root_name)?;
        encoder
            .finish()
            .fs_context("finishing archive", &dest)?
            .sync_all()
            .fs_context("syncing archive", &dest)?;
        log::info!("✓ Created {}", dest.display());
        Ok(dest)
    })
    .await
    .map_err(|e| Error::GenericError(format!("Archive task panicked: {}", e)))?
}

/// Writes `src_dir` as a tar stream into `writer` under `root_name`, returning the writer.
///
/// Entries are appended in file-name order with deterministic headers, so
/// identical trees produce identical archives on any filesystem.
pub fn tar_dir<W: Write>(writer: W, src_dir: &Path, root_name: &str) -> Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.mode(tar::HeaderMode::Deterministic);
    builder.follow_symlinks(false);

    for entry in walkdir::WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src_dir)?;
        let name = if rel.as_os_str().is_empty() {
            PathBuf::from(root_name)
        } else {
            Path::new(root_name).join(rel)
        };
        if entry.file_type().is_dir() {
            builder
                .append_dir(&name, entry.path())
                .fs_context("archiving", entry.path())?;
        } else {
            builder
                .append_path_with_name(entry.path(), &name)
                .fs_context("archiving", entry.path())?;
        }
    }

    builder
        .into_inner()
        .fs_context("finishing tar stream for", src_dir)
}

/// Unpacks a gzip-compressed tar stream into `dest`.
pub fn unpack_tar_gz<R: Read>(reader: R, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).fs_context("creating directory", dest)?;
    tar::Archive::new(GzDecoder::new(reader))
        .unpack(dest)
        .fs_context("unpacking archive into", dest)
}

/// Unpacks the `.tar.gz` at `archive` into `dest`.
pub async fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::open(&archive).fs_context("opening archive", &archive)?;
        unpack_tar_gz(std::io::BufReader::new(file), &dest)
    })
    .await
    .map_err(|e| Error::GenericError(format!("Extraction task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::utils::fs;

    fn files(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut out: Vec<_> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                (
                    e.path().strip_prefix(root).unwrap().to_path_buf(),
                    std::fs::read(e.path()).unwrap(),
                )
            })
            .collect();
        out.sort();
        out
    }

    #[tokio::test]
    async fn extracted_tarball_reproduces_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("akron-1.2.3-linux-amd64");
        fs::write_file(&bundle.join("bin/akron"), b"\x7fELF...").await.unwrap();
        fs::write_file(&bundle.join("share/applications/akron.desktop"), b"[Desktop Entry]\n")
            .await
            .unwrap();
        fs::write_file(
            &bundle.join("share/icons/hicolor/16x16/apps/akron.png"),
            [0u8, 1, 2, 3, 255],
        )
        .await
        .unwrap();

        let archive = tmp.path().join("akron-1.2.3-linux-amd64.tar.gz");
        create_tar_gz(&bundle, "akron-1.2.3-linux-amd64", &archive)
            .await
            .unwrap();

        let unpacked = tmp.path().join("unpacked");
        extract_tar_gz(&archive, &unpacked).await.unwrap();

        assert_eq!(files(&bundle), files(&unpacked.join("akron-1.2.3-linux-amd64")));
    }

    #[tokio::test]
    async fn entries_are_in_file_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("b");
        for name in ["share/zeta", "bin/akron", "share/alpha", "share/mid/x"] {
            fs::write_file(&bundle.join(name), name.as_bytes()).await.unwrap();
        }

        let archive = create_tar_gz(&bundle, "b", &tmp.path().join("b.tar.gz")).await.unwrap();
        let mut tar = tar::Archive::new(GzDecoder::new(std::fs::File::open(archive).unwrap()));
        let names: Vec<String> = tar
            .entries()
            .unwrap()
            .map(|e| {
                let path = e.unwrap().path().unwrap().to_string_lossy().into_owned();
                path.trim_end_matches('/').to_string()
            })
            .collect();
        assert_eq!(
            names,
            ["b", "b/bin", "b/bin/akron", "b/share", "b/share/alpha", "b/share/mid", "b/share/mid/x", "b/share/zeta"]
        );
    }

    #[tokio::test]
    async fn identical_trees_produce_identical_archives() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("b");
        fs::write_file(&bundle.join("bin/akron"), b"binary").await.unwrap();

        let a = create_tar_gz(&bundle, "b", &tmp.path().join("a.tar.gz")).await.unwrap();
        let b = create_tar_gz(&bundle, "b", &tmp.path().join("b.tar.gz")).await.unwrap();
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }
}
