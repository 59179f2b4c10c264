//! Notarization, stapling and trust verification.
//!
//! Submission blocks until the notary service adjudicates, bounded by the
//! configured timeout. There is no retry: a rejection or timeout fails the
//! job.

use crate::bundler::{
    builder::NotarizationAuth,
    error::{Error, Result},
    utils::process::{self, ToolSet, path_arg},
};
use std::{path::Path, time::Duration};

/// Status string of an accepted submission.
const ACCEPTED: &str = "Accepted";

/// Outcome of a finished submission.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
pub struct Submission {
    /// Submission identifier
    pub id: String,
    /// Final status reported by the service
    pub status: String,
}

impl Submission {
    /// Whether the service accepted the submission.
    pub fn accepted(&self) -> bool {
        self.status == ACCEPTED
    }
}

/// Submits `dmg` and waits for the verdict.
///
/// Returns the submission whatever its verdict; callers decide what a
/// rejection means.
pub async fn submit(
    tools: &ToolSet,
    dmg: &Path,
    auth: &NotarizationAuth,
    timeout: Duration,
) -> Result<Submission> {
    log::info!(
        "Submitting {} for notarization (timeout {:?})",
        dmg.display(),
        timeout
    );

    let mut cmd = tools.command("xcrun");
    cmd.args([
        "notarytool",
        "submit",
        path_arg(dmg)?,
        "--wait",
        "--output-format",
        "json",
    ])
    .args(auth.notarytool_args());

    // kill_on_drop reaps notarytool if the timeout fires.
    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(output) => output.map_err(|error| Error::CommandFailed {
            command: "xcrun notarytool".into(),
            error,
        })?,
        Err(_) => return Err(Error::NotarizationTimeout(timeout)),
    };

    // notarytool reports rejections as JSON with a non-zero exit code, so the
    // document decides, not the status.
    match serde_json::from_slice::<Submission>(&output.stdout) {
        Ok(submission) => {
            log::info!(
                "Notarization submission {} finished: {}",
                submission.id,
                submission.status
            );
            Ok(submission)
        }
        Err(_) => Err(Error::ToolFailed {
            tool: "xcrun notarytool".into(),
            status: output.status.to_string(),
            diagnostics: process::diagnostics(&output),
        }),
    }
}

/// Fetches the developer log of a submission, if the service provides one.
pub async fn fetch_log(tools: &ToolSet, id: &str, auth: &NotarizationAuth) -> Option<String> {
    let mut args = vec!["notarytool".to_string(), "log".into(), id.to_string()];
    args.extend(auth.notarytool_args());

    match tools.run("xcrun", &args).await {
        Ok(output) => Some(String::from_utf8_lossy(&output.stdout).trim().to_string()),
        Err(e) => {
            log::debug!("No notarization log for {}: {}", id, e);
            None
        }
    }
}

/// Staples the notarization ticket to `dmg`.
pub async fn staple(tools: &ToolSet, dmg: &Path) -> Result<()> {
    tools
        .run("xcrun", ["stapler", "staple", path_arg(dmg)?])
        .await
        .map_err(|e| Error::TrustVerification(format!("stapling failed: {e}")))?;
    log::info!("✓ Stapled ticket to {}", dmg.display());
    Ok(())
}

/// Independently re-verifies the stapled ticket and the Gatekeeper assessment.
pub async fn validate(tools: &ToolSet, dmg: &Path) -> Result<()> {
    let dmg_arg = path_arg(dmg)?;

    tools
        .run("xcrun", ["stapler", "validate", dmg_arg])
        .await
        .map_err(|e| Error::TrustVerification(format!("stapled ticket does not validate: {e}")))?;

    tools
        .run(
            "spctl",
            [
                "--assess",
                "--type",
                "open",
                "--context",
                "context:primary-signature",
                "-v",
                dmg_arg,
            ],
        )
        .await
        .map_err(|e| Error::TrustVerification(format!("Gatekeeper rejected the image: {e}")))?;

    log::info!("✓ Verified {}", dmg.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_json() {
        let json = br#"{"id":"2efe2717-52ef-43a5-96dc-0797e4ca1041","message":"Processing complete","status":"Invalid"}"#;
        let submission: Submission = serde_json::from_slice(json).unwrap();
        assert_eq!(submission.id, "2efe2717-52ef-43a5-96dc-0797e4ca1041");
        assert!(!submission.accepted());
    }

    #[cfg(unix)]
    fn fake_xcrun(dir: &Path, body: &str) -> ToolSet {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("xcrun");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let mut tools = ToolSet::default();
        tools.set("xcrun", script);
        tools
    }

    #[cfg(unix)]
    fn auth() -> NotarizationAuth {
        NotarizationAuth::AppleId {
            apple_id: "dev@example.com".into(),
            password: "pw".into(),
            team_id: "TEAM".into(),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn rejection_is_read_from_json_despite_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = fake_xcrun(
            tmp.path(),
            r#"echo '{"id":"abc","status":"Invalid","message":"Processing complete"}'; exit 1"#,
        );
        let submission = submit(&tools, &tmp.path().join("a.dmg"), &auth(), Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(submission.id, "abc");
        assert!(!submission.accepted());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn submission_is_bounded_by_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = fake_xcrun(tmp.path(), "sleep 5");
        let err = submit(
            &tools,
            &tmp.path().join("a.dmg"),
            &auth(),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotarizationTimeout(_)));
        assert_eq!(err.kind(), crate::bundler::FailureKind::Trust);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn garbage_output_is_a_tool_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = fake_xcrun(tmp.path(), "echo 'network down' >&2; exit 69");
        let err = submit(&tools, &tmp.path().join("a.dmg"), &auth(), Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolFailed { .. }));
    }
}
