//! Zip archive of the staged Windows bundle.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// Zips `src_dir` under a top-level `root_name/` directory into `dest`.
pub async fn create_zip(src_dir: &Path, root_name: &str, dest: &Path) -> Result<PathBuf> {
    let src_dir = src_dir.to_path_buf();
    let root_name = root_name.to_string();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let file = File::create(&dest).fs_context("creating zip archive", &dest)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o755);

        for entry in walkdir::WalkDir::new(&src_dir).sort_by_file_name() {
            let entry = entry?;
            let rel = entry.path().strip_prefix(&src_dir)?;
            let name = Path::new(&root_name)
                .join(rel)
                .to_string_lossy()
                .replace('\\', "/");

            if entry.file_type().is_dir() {
                zip.add_directory(name, options)?;
            } else {
                zip.start_file(name, options)?;
                let mut input =
                    File::open(entry.path()).fs_context("opening file", entry.path())?;
                io::copy(&mut input, &mut zip).fs_context("compressing file", entry.path())?;
            }
        }

        zip.finish()?;
        log::info!("✓ Created {}", dest.display());
        Ok(dest)
    })
    .await
    .map_err(|e| Error::GenericError(format!("zip task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_live_under_bundle_root() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("stage");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("akron.exe"), b"MZ fake").unwrap();

        let dest = tmp.path().join("akron-1.2.3-windows-amd64.zip");
        create_zip(&src, "akron-1.2.3-windows-amd64", &dest)
            .await
            .unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert!(names.contains(&"akron-1.2.3-windows-amd64/".to_string()));
        assert!(names.contains(&"akron-1.2.3-windows-amd64/akron.exe".to_string()));

        let mut exe = archive
            .by_name("akron-1.2.3-windows-amd64/akron.exe")
            .unwrap();
        let mut contents = Vec::new();
        io::Read::read_to_end(&mut exe, &mut contents).unwrap();
        assert_eq!(contents, b"MZ fake");
    }
}
