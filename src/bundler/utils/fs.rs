//! File system utilities for bundling.
//!
//! Provides file operations with automatic directory creation, symlink
//! preservation and path-carrying errors.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{io, path::Path};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }

    // create_dir_all is already idempotent - succeeds even if dir exists
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(Error::Fs {
            context: "removing directory",
            path: path.to_path_buf(),
            error: e,
        }),
    }
}

/// Removes a file if it exists.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Fs {
            context: "removing file",
            path: path.to_path_buf(),
            error: e,
        }),
    }
}

/// Writes `contents` to `path`, creating parent directories as needed.
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    fs::write(path, contents)
        .await
        .fs_context("writing file", path)
}

/// Makes a symbolic link to a directory.
#[cfg(unix)]
pub fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
pub fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(Error::Fs {
            context: "copying",
            path: from.to_path_buf(),
            error: io::Error::new(io::ErrorKind::NotFound, "not a regular file"),
        });
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks on platforms that support them.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Err(Error::Fs {
            context: "copying",
            path: from.to_path_buf(),
            error: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }

        for entry in walkdir::WalkDir::new(&from) {
            let entry = entry?;
            let rel_path = entry.path().strip_prefix(&from)?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                let target = std::fs::read_link(entry.path())
                    .fs_context("reading symlink", entry.path())?;
                let linked = if entry.path().is_dir() {
                    symlink_dir(&target, &dest_path)
                } else {
                    symlink_file(&target, &dest_path)
                };
                linked.fs_context("creating symlink", &dest_path)?;
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path).fs_context("creating directory", &dest_path)?;
            } else {
                std::fs::copy(entry.path(), &dest_path).fs_context("copying file", entry.path())?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {}", e)))?
}

/// Marks a file executable (0755) on unix hosts.
#[cfg(unix)]
pub async fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .fs_context("setting permissions on", path)
}

/// Marks a file executable (0755) on unix hosts.
#[cfg(not(unix))]
pub async fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_dir_reproduces_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        write_file(&src.join("a/b.txt"), b"hello").await.unwrap();
        write_file(&src.join("c.txt"), b"world").await.unwrap();

        let dst = tmp.path().join("nested/dst");
        copy_dir(&src, &dst).await.unwrap();

        assert_eq!(std::fs::read(dst.join("a/b.txt")).unwrap(), b"hello");
        assert_eq!(std::fs::read(dst.join("c.txt")).unwrap(), b"world");
    }

    #[tokio::test]
    async fn removal_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");
        remove_dir_all(&missing).await.unwrap();
        remove_file(&missing).await.unwrap();
        create_dir_all(&missing, true).await.unwrap();
        assert!(missing.is_dir());
    }
}
