//! macOS application bundle (.app) staging.
//!
//! ```text
//! <Display Name>.app/
//!   Contents/
//!     Info.plist
//!     PkgInfo
//!     MacOS/<binary>
//!     Resources/<product>.icns
//! ```

use crate::bundler::{
    error::{Error, Result},
    platform::PackageContext,
    resources::icons,
    template::{self, INFO_PLIST_TEMPLATE, TemplateData},
    utils::fs,
};
use std::path::PathBuf;

/// Default `LSMinimumSystemVersion`.
const DEFAULT_MINIMUM_SYSTEM_VERSION: &str = "11.0";

/// Creates the `.app` inside the staged bundle root and returns its path.
pub async fn bundle_project(ctx: &PackageContext<'_>) -> Result<PathBuf> {
    let settings = ctx.settings;
    let app = ctx
        .workspace
        .bundle_dir()
        .join(format!("{}.app", settings.display_name()));
    let contents = app.join("Contents");

    log::info!("Creating {}", app.display());
    fs::create_dir_all(&app, true).await?;

    let binary = contents.join("MacOS").join(settings.binary_name());
    fs::copy_file(ctx.artifact, &binary).await?;
    fs::set_executable(&binary).await?;

    icons::build_icns(
        ctx.icons,
        &contents
            .join("Resources")
            .join(format!("{}.icns", settings.product_name())),
    )
    .await?;

    let plist = render_info_plist(ctx).await?;
    fs::write_file(&contents.join("Info.plist"), plist).await?;
    fs::write_file(&contents.join("PkgInfo"), "APPL????").await?;

    log::info!("✓ Created {}", app.display());
    Ok(app)
}

/// Renders and validates `Info.plist`.
async fn render_info_plist(ctx: &PackageContext<'_>) -> Result<String> {
    let settings = ctx.settings;
    let macos = &settings.bundle_settings().macos;

    let mut data = TemplateData::for_target(settings, ctx.target, ctx.bundle_name);
    data.insert(
        "minimumSystemVersion",
        macos
            .minimum_system_version
            .as_deref()
            .unwrap_or(DEFAULT_MINIMUM_SYSTEM_VERSION),
    )
    .insert_opt("copyright", settings.bundle_settings().copyright.as_deref());

    let rendered = template::render(
        "Info.plist",
        macos.info_plist_template.as_deref(),
        INFO_PLIST_TEMPLATE,
        &data,
    )
    .await?;

    let value = plist::Value::from_reader_xml(rendered.as_bytes()).map_err(|e| Error::Template {
        name: "Info.plist".into(),
        reason: format!("rendered property list is invalid: {e}"),
    })?;
    let has_executable = value
        .as_dictionary()
        .and_then(|d| d.get("CFBundleExecutable"))
        .and_then(|v| v.as_string())
        .is_some();
    if !has_executable {
        return Err(Error::Template {
            name: "Info.plist".into(),
            reason: "CFBundleExecutable is missing".into(),
        });
    }

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{
        BundleName,
        platform::{Workspace, test_support},
        target::default_matrix,
    };

    #[tokio::test]
    async fn app_bundle_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = test_support::settings(tmp.path());
        let target = &default_matrix()[3];
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

        let app = bundle_project(&ctx).await.unwrap();
        assert!(app.ends_with("akron-1.2.3-darwin-arm64/akron.app"));
        assert!(app.join("Contents/MacOS/akron").is_file());
        assert!(app.join("Contents/Resources/akron.icns").is_file());

        let plist = plist::Value::from_file(app.join("Contents/Info.plist")).unwrap();
        let dict = plist.as_dictionary().unwrap();
        assert_eq!(
            dict.get("CFBundleShortVersionString").unwrap().as_string(),
            Some("1.2.3")
        );
        assert_eq!(
            dict.get("CFBundleIdentifier").unwrap().as_string(),
            Some("io.akron.app")
        );
    }
}
