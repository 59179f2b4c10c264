//! Finder window layout of the disk image.
//!
//! The image is attached read-write at a job-scoped mountpoint, laid out with
//! AppleScript and detached again. The attach stays browsable: Finder only
//! resolves `disk "<volume>"` for volumes it can see. A failed layout only costs appearance, so
//! it is reported as a warning; failing to attach is an error.

use crate::bundler::{
    error::Result,
    utils::{
        fs,
        process::{ToolSet, path_arg},
    },
};
use std::path::Path;
use tokio::time::Duration;

/// Time Finder needs to persist `.DS_Store` before detaching.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Fixed window geometry of the install window.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    /// Volume name as Finder sees it
    pub volume_name: String,
    /// File name of the `.app`
    pub app_name: String,
    /// Window bounds: left, top, right, bottom
    pub bounds: (u32, u32, u32, u32),
    /// Icon size in points
    pub icon_size: u32,
    /// Position of the app icon
    pub app_position: (u32, u32),
    /// Position of the Applications link
    pub applications_position: (u32, u32),
}

impl Layout {
    /// The standard 660x400 drag-to-install layout.
    pub fn new(volume_name: &str, app_name: &str) -> Self {
        Self {
            volume_name: volume_name.to_string(),
            app_name: app_name.to_string(),
            bounds: (100, 100, 760, 500),
            icon_size: 72,
            app_position: (180, 170),
            applications_position: (480, 170),
        }
    }

    /// AppleScript applying this layout.
    pub fn script(&self) -> String {
        let (left, top, right, bottom) = self.bounds;
        let (app_x, app_y) = self.app_position;
        let (apps_x, apps_y) = self.applications_position;
        format!(
            r#"tell application "Finder"
    tell disk "{volume}"
        open
        set current view of container window to icon view
        set toolbar visible of container window to false
        set statusbar visible of container window to false
        set bounds of container window to {{{left}, {top}, {right}, {bottom}}}
        set viewOptions to icon view options of container window
        set arrangement of viewOptions to not arranged
        set icon size of viewOptions to {icon_size}
        set position of item "{app}" to {{{app_x}, {app_y}}}
        set position of item "Applications" to {{{apps_x}, {apps_y}}}
        close
        open
        update without registering applications
        delay 2
    end tell
end tell
"#,
            volume = escape_applescript_string(&self.volume_name),
            app = escape_applescript_string(&self.app_name),
            icon_size = self.icon_size,
        )
    }
}

/// Mounts `dmg` at `mountpoint`, applies `layout` and detaches.
///
/// Returns a warning if the layout or the detach did not go through.
pub async fn apply_layout(
    tools: &ToolSet,
    dmg: &Path,
    mountpoint: &Path,
    layout: &Layout,
) -> Result<Option<String>> {
    fs::create_dir_all(mountpoint, true).await?;
    let mount_arg = path_arg(mountpoint)?;

    tools
        .run(
            "hdiutil",
            [
                "attach",
                path_arg(dmg)?,
                "-readwrite",
                "-noverify",
                "-mountpoint",
                mount_arg,
            ],
        )
        .await?;
    log::debug!("Attached {} at {}", dmg.display(), mountpoint.display());

    let mut warning = match tools.run("osascript", ["-e", layout.script().as_str()]).await {
        Ok(_) => None,
        Err(e) => {
            log::warn!("Disk image layout was not applied: {}", e);
            Some(format!("disk image window layout was not applied: {e}"))
        }
    };

    tokio::time::sleep(SETTLE_DELAY).await;

    if let Err(e) = tools.run("hdiutil", ["detach", mount_arg]).await {
        log::warn!("Detach failed, forcing: {}", e);
        if let Err(e) = tools.run("hdiutil", ["detach", mount_arg, "-force"]).await {
            if warning.is_none() {
                warning = Some(format!("disk image did not detach cleanly: {e}"));
            }
        }
    }

    Ok(warning)
}

/// Escapes backslashes and double quotes for AppleScript string literals.
fn escape_applescript_string(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', r#"\""#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_script_uses_fixed_geometry() {
        let script = Layout::new("akron-1.2.3-darwin-arm64", "akron.app").script();
        assert!(script.contains(r#"tell disk "akron-1.2.3-darwin-arm64""#));
        assert!(script.contains("set bounds of container window to {100, 100, 760, 500}"));
        assert!(script.contains("set icon size of viewOptions to 72"));
        assert!(script.contains(r#"set position of item "akron.app" to {180, 170}"#));
        assert!(script.contains(r#"set position of item "Applications" to {480, 170}"#));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn image_is_attached_where_finder_can_see_it() {
        use crate::bundler::platform::test_support::fake_tool;

        let tmp = tempfile::tempdir().unwrap();
        let calls = tmp.path().join("calls.log");
        let record = format!("echo \"$*\" >> '{}'\nexit 0", calls.display());
        let mut tools = ToolSet::default();
        tools.set("hdiutil", fake_tool(&tmp.path().join("bin"), "hdiutil", &record));
        tools.set("osascript", fake_tool(&tmp.path().join("bin"), "osascript", &record));

        let dmg = tmp.path().join("akron.dmg");
        let mountpoint = tmp.path().join("mnt");
        let layout = Layout::new("akron-1.2.3-darwin-arm64", "akron.app");
        let warning = apply_layout(&tools, &dmg, &mountpoint, &layout).await.unwrap();
        assert_eq!(warning, None);

        let calls = std::fs::read_to_string(&calls).unwrap();
        let attach = calls.lines().find(|l| l.starts_with("attach")).unwrap();
        assert!(!attach.contains("-nobrowse"));
        assert!(attach.ends_with(&format!("-mountpoint {}", mountpoint.display())));
        assert!(calls.lines().any(|l| l.contains("tell disk \"akron-1.2.3-darwin-arm64\"")));
        assert!(calls.lines().last().unwrap().starts_with("detach"));
    }

    #[test]
    fn applescript_strings_are_escaped() {
        assert_eq!(escape_applescript_string(r#"My"App"#), r#"My\"App"#);
        assert_eq!(escape_applescript_string(r"Path\File"), r"Path\\File");
    }
}
