//! macOS packaging: signed `.app` inside a signed, notarized and stapled `.dmg`.
//!
//! The trust pipeline is an explicit state machine:
//!
//! ```text
//! Staged -> Signed -> ImageBuilt -> Submitted -> Adjudicated(Pass) -> Stapled -> Verified
//!                                             \-> Adjudicated(Fail)   (terminal)
//! ```
//!
//! Every step checks its predecessor, so stapling a rejected image or
//! verifying an unstapled one is an [`Error::InvalidTransition`]. Only a
//! `Verified` image is moved into the job's `out/` directory.

pub mod app;
pub mod dmg;
pub mod keychain;
pub mod notarize;
pub mod sign;

use crate::bundler::{
    PackageType,
    builder::{MacCredentials, NotarizationAuth},
    error::{Context, Error, ErrorExt, Result},
    platform::{PackageContext, PackageOutput, StagedBundle},
    utils::fs,
};
use keychain::EphemeralKeychain;
use sign::Signer;
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

/// Notarization verdict.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Accepted by the notary service
    Pass,
    /// Rejected or invalid
    Fail,
}

/// Stage of the macOS trust pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MacStage {
    /// `.app` assembled, unsigned
    Staged,
    /// `.app` signed and verified
    Signed,
    /// Disk image built and signed
    ImageBuilt,
    /// Disk image submitted, verdict pending
    Submitted,
    /// Verdict received
    Adjudicated(Verdict),
    /// Ticket stapled to the image
    Stapled,
    /// Ticket and Gatekeeper assessment verified
    Verified,
}

impl fmt::Display for MacStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacStage::Staged => f.write_str("staged"),
            MacStage::Signed => f.write_str("signed"),
            MacStage::ImageBuilt => f.write_str("image-built"),
            MacStage::Submitted => f.write_str("submitted"),
            MacStage::Adjudicated(Verdict::Pass) => f.write_str("adjudicated(pass)"),
            MacStage::Adjudicated(Verdict::Fail) => f.write_str("adjudicated(fail)"),
            MacStage::Stapled => f.write_str("stapled"),
            MacStage::Verified => f.write_str("verified"),
        }
    }
}

/// Reclassifies tool failures inside the trust pipeline as signing failures.
pub(crate) fn trust_error(e: Error) -> Error {
    match e {
        Error::ToolFailed { .. } | Error::CommandFailed { .. } => Error::Signing(e.to_string()),
        other => other,
    }
}

/// Drives one `.app` through signing, imaging and notarization.
#[derive(Debug)]
pub struct MacPipeline<'a> {
    signer: Signer<'a>,
    app: PathBuf,
    volume_name: String,
    scratch: PathBuf,
    stage: MacStage,
    image: Option<PathBuf>,
    warnings: Vec<String>,
}

impl<'a> MacPipeline<'a> {
    /// Starts the pipeline for a staged `.app`.
    pub fn new(signer: Signer<'a>, app: PathBuf, volume_name: &str, scratch: PathBuf) -> Self {
        Self {
            signer,
            app,
            volume_name: volume_name.to_string(),
            scratch,
            stage: MacStage::Staged,
            image: None,
            warnings: Vec::new(),
        }
    }

    /// Current stage.
    pub fn stage(&self) -> MacStage {
        self.stage
    }

    fn require(&self, expected: MacStage, next: MacStage) -> Result<()> {
        if self.stage != expected {
            return Err(Error::InvalidTransition {
                from: self.stage.to_string(),
                to: next.to_string(),
            });
        }
        Ok(())
    }

    fn image(&self) -> Result<&Path> {
        self.image
            .as_deref()
            .ok_or_else(|| Error::GenericError("disk image has not been built".into()))
    }

    /// Deep-signs the `.app`.
    pub async fn sign_app(&mut self) -> Result<()> {
        self.require(MacStage::Staged, MacStage::Signed)?;
        self.signer.sign_app(&self.app).await?;
        self.stage = MacStage::Signed;
        Ok(())
    }

    /// Builds and signs the disk image around the signed `.app`.
    pub async fn build_image(&mut self) -> Result<()> {
        self.require(MacStage::Signed, MacStage::ImageBuilt)?;
        let image = dmg::build(self.signer.tools, &self.app, &self.volume_name, &self.scratch).await?;
        self.signer.sign_image(&image.path).await?;
        self.warnings.extend(image.warnings);
        self.image = Some(image.path);
        self.stage = MacStage::ImageBuilt;
        Ok(())
    }

    /// Submits the image and waits for the verdict. A rejection is terminal.
    pub async fn notarize(&mut self, auth: &NotarizationAuth, timeout: Duration) -> Result<()> {
        self.require(MacStage::ImageBuilt, MacStage::Submitted)?;
        self.stage = MacStage::Submitted;

        let tools = self.signer.tools;
        let image = self.image()?.to_path_buf();
        // A notarytool that cannot deliver a verdict is an external tool
        // failure; only the verdict itself is a trust decision.
        let submission = notarize::submit(tools, &image, auth, timeout).await?;

        if submission.accepted() {
            self.stage = MacStage::Adjudicated(Verdict::Pass);
            return Ok(());
        }

        self.stage = MacStage::Adjudicated(Verdict::Fail);
        let log = notarize::fetch_log(tools, &submission.id, auth)
            .await
            .map(|log| format!(":\n{log}"))
            .unwrap_or_default();
        Err(Error::NotarizationRejected {
            submission_id: submission.id,
            status: submission.status,
            log,
        })
    }

    /// Staples the ticket of an accepted submission.
    pub async fn staple(&mut self) -> Result<()> {
        self.require(MacStage::Adjudicated(Verdict::Pass), MacStage::Stapled)?;
        notarize::staple(self.signer.tools, self.image()?).await?;
        self.stage = MacStage::Stapled;
        Ok(())
    }

    /// Re-verifies the stapled image independently of the notary's verdict.
    pub async fn verify(&mut self) -> Result<()> {
        self.require(MacStage::Stapled, MacStage::Verified)?;
        let image = self.image()?;
        notarize::validate(self.signer.tools, image).await?;
        self.signer.verify(image).await?;
        self.stage = MacStage::Verified;
        Ok(())
    }

    /// Moves the verified image to `dest` and returns the collected warnings.
    pub async fn finish(self, dest: &Path) -> Result<Vec<String>> {
        if self.stage != MacStage::Verified {
            return Err(Error::InvalidTransition {
                from: self.stage.to_string(),
                to: "collected".into(),
            });
        }
        let image = self.image()?;
        fs::remove_file(dest).await?;
        tokio::fs::rename(image, dest)
            .await
            .fs_context("moving disk image to", dest)?;
        Ok(self.warnings)
    }
}

/// Stages the `.app` bundle.
pub async fn stage(ctx: &PackageContext<'_>) -> Result<StagedBundle> {
    let app = app::bundle_project(ctx).await?;
    Ok(StagedBundle {
        root: ctx.workspace.bundle_dir(),
        entry: app,
    })
}

/// Produces the trusted `.dmg`.
pub async fn package(ctx: &PackageContext<'_>, staged: &StagedBundle) -> Result<PackageOutput> {
    let settings = ctx.settings;
    let credentials = settings.mac_credentials().ok_or_else(|| {
        Error::Signing("no signing credentials configured (APPLE_CERTIFICATE is not set)".into())
    })?;

    let tools = settings.tools();
    let scratch = ctx.workspace.scratch();
    let keychain = EphemeralKeychain::create(tools, &scratch, &credentials.signing)
        .await
        .context("preparing signing keychain")?;

    let dmg = ctx.workspace.package_path(PackageType::Dmg);
    let result = trusted_image(ctx, staged, credentials, keychain.path(), &dmg).await;
    if let Err(e) = keychain.close().await {
        log::warn!("Keychain teardown failed: {}", e);
    }
    let warnings = result?;

    log::info!("✓ Created trusted disk image {}", dmg.display());
    Ok(PackageOutput {
        files: vec![dmg],
        warnings,
    })
}

/// Runs the trust pipeline with the identity in `keychain` and moves the
/// verified image to `dest`.
async fn trusted_image(
    ctx: &PackageContext<'_>,
    staged: &StagedBundle,
    credentials: &MacCredentials,
    keychain: &Path,
    dest: &Path,
) -> Result<Vec<String>> {
    let settings = ctx.settings;
    let signer = Signer {
        tools: settings.tools(),
        keychain,
        identity: &credentials.signing.identity,
        entitlements: settings.bundle_settings().macos.entitlements.as_deref(),
    };

    let mut pipeline = MacPipeline::new(
        signer,
        staged.entry.clone(),
        ctx.bundle_name.as_str(),
        ctx.workspace.scratch(),
    );
    pipeline.sign_app().await?;
    pipeline.build_image().await?;
    pipeline
        .notarize(&credentials.notarization, settings.notarization_timeout())
        .await?;
    pipeline.staple().await?;
    pipeline.verify().await?;
    pipeline.finish(dest).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{FailureKind, utils::process::ToolSet};

    #[tokio::test]
    async fn verify_before_staple_is_rejected() {
        let tools = ToolSet::default();
        let signer = Signer {
            tools: &tools,
            keychain: Path::new("/tmp/none.keychain-db"),
            identity: "-",
            entitlements: None,
        };
        let mut pipeline = MacPipeline::new(
            signer,
            PathBuf::from("/tmp/akron.app"),
            "akron-1.2.3-darwin-arm64",
            PathBuf::from("/tmp"),
        );

        let err = pipeline.verify().await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(err.kind(), FailureKind::Trust);
        assert_eq!(
            err.to_string(),
            "invalid macOS packaging transition from staged to verified"
        );

        let err = pipeline.staple().await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(pipeline.stage(), MacStage::Staged);
    }

    #[test]
    fn tool_failures_become_trust_failures() {
        let err = trust_error(Error::ToolFailed {
            tool: "codesign".into(),
            status: "exit status: 1".into(),
            diagnostics: "no identity found".into(),
        });
        assert!(matches!(err, Error::Signing(_)));
        assert_eq!(err.kind(), FailureKind::Trust);

        let err = trust_error(Error::MissingTemplate(PathBuf::from("e.plist")));
        assert_eq!(err.kind(), FailureKind::MissingInput);
    }

    #[cfg(unix)]
    mod fake_tools {
        use super::*;
        use crate::bundler::{
            BundleName, MacCredentials, SigningCredentials,
            platform::{Workspace, test_support},
            resources::icons,
            target::default_matrix,
        };

        const HDIUTIL: &str = r#"case "$1" in
  create) for a; do last="$a"; done; echo image > "$last" ;;
  convert) src="$2"; while [ $# -gt 0 ]; do [ "$1" = "-o" ] && dst="$2"; shift; done; cp "$src" "$dst" ;;
esac
exit 0"#;

        fn credentials() -> MacCredentials {
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

        fn verdict(status: &str) -> String {
            format!(r#"echo '{{"id":"sub-1","status":"{status}","message":"done"}}'"#)
        }

        /// Packages a Mac target; `submit` is the shell body of `notarytool submit`.
        async fn run(submit: &str) -> (tempfile::TempDir, Workspace, Result<PackageOutput>) {
            let tmp = tempfile::tempdir().unwrap();
            let bin = tmp.path().join("tools");
            let calls = tmp.path().join("calls.log");
            let log_call = format!("echo \"$0 $1\" >> '{}'", calls.display());
            let xcrun = format!(
                r#"{log_call}
if [ "$2" = submit ]; then {submit}; fi
if [ "$2" = log ]; then echo 'The binary is not signed.'; fi
exit 0"#
            );

            let settings = test_support::builder(tmp.path())
                .tool("security", test_support::fake_tool(&bin, "security", "exit 0"))
                .tool("codesign", test_support::fake_tool(&bin, "codesign", &format!("{log_call}\nexit 0")))
                .tool("hdiutil", test_support::fake_tool(&bin, "hdiutil", &format!("{log_call}\n{HDIUTIL}")))
                .tool("osascript", test_support::fake_tool(&bin, "osascript", "exit 1"))
                .tool("xcrun", test_support::fake_tool(&bin, "xcrun", &xcrun))
                .tool("spctl", test_support::fake_tool(&bin, "spctl", &format!("{log_call}\nexit 0")))
                .mac_credentials(Some(credentials()))
                .build()
                .unwrap();

            let target = &default_matrix()[3];
            let bundle_name = BundleName::new("akron", settings.version(), target);
            let workspace = Workspace::create(&tmp.path().join("work"), &bundle_name)
                .await
                .unwrap();
            let artifact = test_support::fake_artifact(&tmp.path().join("bin"), "akron");
            let icon_set = icons::load_icon_set(&settings.icons_dir()).await.unwrap();
            let ctx = PackageContext {
                settings: &settings,
                target,
                bundle_name: &bundle_name,
                workspace: &workspace,
                artifact: &artifact,
                icons: &icon_set,
            };

            let staged = stage(&ctx).await.unwrap();
            let result = package(&ctx, &staged).await;
            (tmp, workspace, result)
        }

        #[tokio::test]
        async fn accepted_image_is_stapled_verified_and_collected() {
            let (tmp, workspace, result) = run(&verdict("Accepted")).await;
            let output = result.unwrap();

            let dmg = workspace.package_path(PackageType::Dmg);
            assert_eq!(output.files, vec![dmg.clone()]);
            assert!(dmg.is_file());
            // osascript failed: only a warning.
            assert_eq!(output.warnings.len(), 1);

            let calls = std::fs::read_to_string(tmp.path().join("calls.log")).unwrap();
            let order: Vec<&str> = calls
                .lines()
                .filter_map(|l| l.rsplit('/').next())
                .collect();
            let pos = |needle: &str| order.iter().position(|l| *l == needle).unwrap();
            assert!(pos("hdiutil create") < pos("xcrun notarytool"));
            assert!(pos("xcrun notarytool") < pos("xcrun stapler"));
            assert!(pos("xcrun stapler") < pos("spctl --assess"));
        }

        #[tokio::test]
        async fn rejected_image_is_never_collected() {
            let (_tmp, workspace, result) = run(&verdict("Invalid")).await;
            let err = result.unwrap_err();

            assert_eq!(err.kind(), FailureKind::Trust);
            match &err {
                Error::NotarizationRejected { submission_id, log, .. } => {
                    assert_eq!(submission_id, "sub-1");
                    assert!(log.contains("not signed"));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(!workspace.package_path(PackageType::Dmg).exists());
        }

        #[tokio::test]
        async fn unreachable_notary_is_an_external_tool_failure() {
            let (_tmp, workspace, result) =
                run("echo 'Error: HTTP status code: 503. Service Unavailable' >&2; exit 69").await;
            let err = result.unwrap_err();

            assert_eq!(err.kind(), FailureKind::ExternalTool);
            match &err {
                Error::ToolFailed { tool, diagnostics, .. } => {
                    assert_eq!(tool, "xcrun notarytool");
                    assert!(diagnostics.contains("503"));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(!workspace.package_path(PackageType::Dmg).exists());
        }

        #[tokio::test]
        async fn missing_credentials_fail_as_trust() {
            let tmp = tempfile::tempdir().unwrap();
            let settings = test_support::settings(tmp.path());
            let target = &default_matrix()[2];
            let bundle_name = BundleName::new("akron", settings.version(), target);
            let workspace = Workspace::create(&tmp.path().join("work"), &bundle_name)
                .await
                .unwrap();
            let artifact = test_support::fake_artifact(&tmp.path().join("bin"), "akron");
            let icon_set = icons::load_icon_set(&settings.icons_dir()).await.unwrap();
            let ctx = PackageContext {
                settings: &settings,
                target,
                bundle_name: &bundle_name,
                workspace: &workspace,
                artifact: &artifact,
                icons: &icon_set,
            };
            let staged = stage(&ctx).await.unwrap();
            let err = package(&ctx, &staged).await.unwrap_err();
            assert_eq!(err.kind(), FailureKind::Trust);
        }
    }
}
