//! Shared fixtures: a project directory with icons, fake artifacts and fake
//! external tools.

#![allow(dead_code)]

use kodegen_bundler_matrix::bundler::{
    BuildTarget, MacCredentials, NotarizationAuth, PackageSettings, SettingsBuilder,
    SigningCredentials,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub const ICON_SIZES: [u32; 9] = [16, 24, 32, 48, 64, 128, 256, 512, 1024];

pub const MANIFEST: &str = include_str!("../fixtures/Cargo.toml");

const HDIUTIL: &str = r#"case "$1" in
  create) for a; do last="$a"; done; echo image > "$last" ;;
  convert) src="$2"; while [ $# -gt 0 ]; do [ "$1" = "-o" ] && dst="$2"; shift; done; cp "$src" "$dst" ;;
esac
exit 0"#;

const WIX_OK: &str = r#"while [ $# -gt 0 ]; do [ "$1" = "-o" ] && out="$2"; shift; done
echo msi > "$out"
echo pdb > "${out%.msi}.wixpdb""#;

pub const WIX_BROKEN: &str = "echo 'error WIX0200: The File element contains an unhandled extension element' >&2; exit 1";

/// A throwaway project rooted in a temporary directory.
pub struct Project {
    pub dir: tempfile::TempDir,
}

impl Project {
    /// Project with the fixture manifest and a complete icon set.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), MANIFEST).unwrap();

        let icons = dir.path().join("assets/icons");
        std::fs::create_dir_all(&icons).unwrap();
        for size in ICON_SIZES {
            image::RgbaImage::from_pixel(size, size, image::Rgba([0x2a, 0x6f, 0xdb, 0xff]))
                .save(icons.join(format!("icon_{size}x{size}.png")))
                .unwrap();
        }
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest(&self) -> PathBuf {
        self.path().join("Cargo.toml")
    }

    pub fn target_dir(&self) -> PathBuf {
        self.path().join("target")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path().join("dist")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.path().join("work")
    }

    /// Places a prebuilt binary where the builder expects it.
    pub fn artifact(&self, target: &BuildTarget) -> PathBuf {
        let name = format!("akron{}", target.os.exe_suffix());
        let dir = self.target_dir().join(&target.triple).join("release");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, b"\x7fELF fake binary contents").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Writes an executable shell script into `tools/`.
    pub fn tool(&self, name: &str, body: &str) -> PathBuf {
        let dir = self.path().join("tools");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Settings for a prebuilt run, with every macOS and Windows tool faked.
    ///
    /// `notary_status` is what the notary service reports; `wix` is the body
    /// of the fake installer compiler.
    pub fn builder(&self, notary_status: &str, wix: &str) -> SettingsBuilder {
        let xcrun = format!(
            r#"if [ "$2" = submit ]; then echo '{{"id":"sub-1","status":"{notary_status}","message":"done"}}'; fi
if [ "$2" = log ]; then echo 'The signature of the binary is invalid.'; fi
exit 0"#
        );
        let version = kodegen_bundler_matrix::version::resolve(MANIFEST, Some("v1.2.3")).unwrap();

        SettingsBuilder::new()
            .project_dir(self.path())
            .target_dir(self.target_dir())
            .work_dir(self.work_dir())
            .output_dir(self.output_dir())
            .version(version)
            .package_settings(PackageSettings {
                product_name: "akron".into(),
                binary_name: "akron".into(),
                description: "Spaces wallet".into(),
                license: Some("Apache-2.0".into()),
                authors: Some(vec!["Akron Developers <dev@akron.example>".into()]),
                ..Default::default()
            })
            .skip_build(true)
            .tool("security", self.tool("security", "exit 0"))
            .tool("codesign", self.tool("codesign", "exit 0"))
            .tool("hdiutil", self.tool("hdiutil", HDIUTIL))
            .tool("osascript", self.tool("osascript", "exit 0"))
            .tool("xcrun", self.tool("xcrun", &xcrun))
            .tool("spctl", self.tool("spctl", "exit 0"))
            .tool("rcedit", self.tool("rcedit", "exit 0"))
            .tool("wix", self.tool("wix", wix))
            .mac_credentials(Some(credentials()))
    }

    /// Builder for a run where everything succeeds.
    pub fn healthy(&self) -> SettingsBuilder {
        self.builder("Accepted", WIX_OK)
    }
}

pub fn credentials() -> MacCredentials {
    MacCredentials {
        signing: SigningCredentials {
            certificate: vec![0x30, 0x82],
            certificate_password: "pw".into(),
            identity: "Developer ID Application: Akron (TEAM)".into(),
        },
        notarization: NotarizationAuth::AppleId {
            apple_id: "dev@akron.example".into(),
            password: "pw".into(),
            team_id: "TEAM".into(),
        },
    }
}

/// File names in `dir`, sorted.
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
