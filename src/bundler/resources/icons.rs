//! Source icon loading and platform icon containers.
//!
//! The icon pipeline supplies one PNG per size in [`ICON_SIZES`] named
//! `icon_{N}x{N}.png`, plus an optional `icon.svg`. The Linux packager installs
//! them as a hicolor theme, the macOS packager composes an `.icns` and the
//! Windows packager an `.ico`.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::path::{Path, PathBuf};

/// Pixel sizes every icon source directory must provide.
pub const ICON_SIZES: [u32; 9] = [16, 24, 32, 48, 64, 128, 256, 512, 1024];

/// Largest size an ICO directory entry can hold.
const MAX_ICO_SIZE: u32 = 256;

/// One validated square PNG.
#[derive(Clone, Debug)]
pub struct SourceIcon {
    /// Edge length in pixels
    pub size: u32,
    /// Path to the PNG
    pub path: PathBuf,
}

/// The complete, validated set of source icons.
#[derive(Clone, Debug)]
pub struct IconSet {
    icons: Vec<SourceIcon>,
    svg: Option<PathBuf>,
}

impl IconSet {
    /// Icons in ascending size order.
    pub fn icons(&self) -> &[SourceIcon] {
        &self.icons
    }

    /// Scalable icon, if the source directory has one.
    pub fn svg(&self) -> Option<&Path> {
        self.svg.as_deref()
    }

    /// The icon of exactly `size` pixels.
    pub fn get(&self, size: u32) -> Option<&SourceIcon> {
        self.icons.iter().find(|i| i.size == size)
    }
}

/// File name of the source icon for `size`.
pub fn icon_file_name(size: u32) -> String {
    format!("icon_{size}x{size}.png")
}

/// Loads and validates the icon set in `dir`.
///
/// Every size in [`ICON_SIZES`] must exist and decode to exactly that many
/// pixels on each edge; otherwise the result is [`Error::MissingIcon`].
pub async fn load_icon_set(dir: &Path) -> Result<IconSet> {
    let dir = dir.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<IconSet> {
        let mut icons = Vec::with_capacity(ICON_SIZES.len());

        for size in ICON_SIZES {
            let path = dir.join(icon_file_name(size));
            let missing = || Error::MissingIcon {
                size,
                path: path.clone(),
            };

            if !path.is_file() {
                return Err(missing());
            }
            let (width, height) = image::image_dimensions(&path).map_err(|e| {
                log::debug!("Cannot read {}: {}", path.display(), e);
                missing()
            })?;
            if width != size || height != size {
                log::warn!(
                    "{} is {}x{}, expected {}x{}",
                    path.display(),
                    width,
                    height,
                    size,
                    size
                );
                return Err(missing());
            }

            icons.push(SourceIcon {
                size,
                path: path.clone(),
            });
        }

        let svg = dir.join("icon.svg");
        let svg = svg.is_file().then_some(svg);

        log::debug!("Loaded {} source icons from {}", icons.len(), dir.display());
        Ok(IconSet { icons, svg })
    })
    .await
    .map_err(|e| Error::GenericError(format!("Icon loading task panicked: {}", e)))?
}

/// Writes an `.icns` composite of every size the format can represent.
pub async fn build_icns(set: &IconSet, dest: &Path) -> Result<()> {
    let icons = set.icons.clone();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut family = icns::IconFamily::new();

        for icon in &icons {
            let rgba = image::open(&icon.path)?.to_rgba8();
            let (width, height) = rgba.dimensions();
            let image = icns::Image::from_data(icns::PixelFormat::RGBA, width, height, rgba.into_raw())
                .fs_context("encoding icns image from", &icon.path)?;

            // A size can map to a 1x slot, a 2x slot, or neither (e.g. 24px).
            for density in [1, 2] {
                if let Some(icon_type) = icns::IconType::from_pixel_size_and_density(width, height, density)
                    && !family.has_icon_with_type(icon_type)
                {
                    family
                        .add_icon_with_type(&image, icon_type)
                        .fs_context("adding icns entry from", &icon.path)?;
                }
            }
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }
        let file = std::fs::File::create(&dest).fs_context("creating icns file", &dest)?;
        family
            .write(std::io::BufWriter::new(file))
            .fs_context("writing icns file", &dest)?;

        log::info!("✓ Created {}", dest.display());
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("icns task panicked: {}", e)))?
}

/// Writes an `.ico` holding every source size up to 256 pixels.
pub async fn build_ico(set: &IconSet, dest: &Path) -> Result<()> {
    let icons: Vec<SourceIcon> = set
        .icons
        .iter()
        .filter(|i| i.size <= MAX_ICO_SIZE)
        .cloned()
        .collect();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut dir = ico::IconDir::new(ico::ResourceType::Icon);

        for icon in &icons {
            let rgba = image::open(&icon.path)?.to_rgba8();
            let (width, height) = rgba.dimensions();
            let image = ico::IconImage::from_rgba_data(width, height, rgba.into_raw());
            let entry = ico::IconDirEntry::encode(&image).fs_context("encoding ico entry from", &icon.path)?;
            dir.add_entry(entry);
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }
        let file = std::fs::File::create(&dest).fs_context("creating ico file", &dest)?;
        dir.write(std::io::BufWriter::new(file))
            .fs_context("writing ico file", &dest)?;

        log::info!("✓ Created {}", dest.display());
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("ico task panicked: {}", e)))?
}


#[cfg(test)]
mod tests {
    use super::test_support::write_icon_set;
    use super::*;

    #[tokio::test]
    async fn complete_set_loads() {
        let tmp = tempfile::tempdir().unwrap();
        write_icon_set(tmp.path());
        let set = load_icon_set(tmp.path()).await.unwrap();
        assert_eq!(set.icons().len(), ICON_SIZES.len());
        assert!(set.svg().is_none());
        assert_eq!(set.get(1024).unwrap().size, 1024);
    }

    #[tokio::test]
    async fn missing_size_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        write_icon_set(tmp.path());
        std::fs::remove_file(tmp.path().join("icon_48x48.png")).unwrap();

        let err = load_icon_set(tmp.path()).await.unwrap_err();
        assert!(matches!(err, Error::MissingIcon { size: 48, .. }));
    }

    #[tokio::test]
    async fn wrong_dimensions_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        write_icon_set(tmp.path());
        image::RgbaImage::new(30, 30)
            .save(tmp.path().join("icon_32x32.png"))
            .unwrap();

        let err = load_icon_set(tmp.path()).await.unwrap_err();
        assert!(matches!(err, Error::MissingIcon { size: 32, .. }));
    }

    #[tokio::test]
    async fn ico_caps_at_256() {
        let tmp = tempfile::tempdir().unwrap();
        write_icon_set(tmp.path());
        let set = load_icon_set(tmp.path()).await.unwrap();
        let dest = tmp.path().join("out/app.ico");
        build_ico(&set, &dest).await.unwrap();

        let dir = ico::IconDir::read(std::fs::File::open(&dest).unwrap()).unwrap();
        let mut sizes: Vec<u32> = dir.entries().iter().map(|e| e.width()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![16, 24, 32, 48, 64, 128, 256]);
    }
}
