//! Job-scoped ephemeral keychain.
//!
//! Each macOS job imports the signing certificate into its own keychain,
//! created in the job's scratch directory and unlocked with a one-time
//! passphrase. The certificate bytes only touch disk in a temporary file that
//! is removed right after import. [`EphemeralKeychain::close`] removes the
//! keychain from the user search list and deletes it; dropping an unclosed
//! keychain does the same synchronously.

use super::trust_error;
use crate::bundler::{
    builder::SigningCredentials,
    error::{Error, ErrorExt, Result},
    utils::process::{ToolSet, path_arg},
};
use std::{
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Mutex,
    time::Duration,
};
use wait_timeout::ChildExt;

/// Serializes edits of the user keychain search list across concurrent jobs.
static SEARCH_LIST_LOCK: Mutex<()> = Mutex::new(());

/// Upper bound on each teardown command.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Auto-lock timeout (seconds) applied to the keychain.
const LOCK_TIMEOUT_SECS: &str = "21600";

/// An unlocked keychain holding one signing identity.
#[derive(Debug)]
pub struct EphemeralKeychain {
    path: PathBuf,
    security: PathBuf,
    closed: bool,
}

impl EphemeralKeychain {
    /// Creates the keychain in `dir` and imports the certificate.
    pub async fn create(tools: &ToolSet, dir: &Path, signing: &SigningCredentials) -> Result<Self> {
        let path = dir.join("signing.keychain-db");
        let passphrase = uuid::Uuid::new_v4().simple().to_string();
        let kc = path_arg(&path)?.to_string();

        tools
            .run("security", ["create-keychain", "-p", passphrase.as_str(), kc.as_str()])
            .await
            .map_err(trust_error)?;

        // From here on, dropping the guard deletes the keychain.
        let keychain = Self {
            path,
            security: tools.program("security"),
            closed: false,
        };

        tools
            .run("security", ["set-keychain-settings", "-lut", LOCK_TIMEOUT_SECS, kc.as_str()])
            .await
            .map_err(trust_error)?;
        tools
            .run("security", ["unlock-keychain", "-p", passphrase.as_str(), kc.as_str()])
            .await
            .map_err(trust_error)?;

        keychain.import(tools, dir, signing).await?;

        tools
            .run(
                "security",
                [
                    "set-key-partition-list",
                    "-S",
                    "apple-tool:,apple:,codesign:",
                    "-s",
                    "-k",
                    passphrase.as_str(),
                    kc.as_str(),
                ],
            )
            .await
            .map_err(trust_error)?;

        let security = keychain.security.clone();
        let added = keychain.path.clone();
        tokio::task::spawn_blocking(move || edit_search_list(&security, |list| list.insert(0, added)))
            .await
            .map_err(|e| Error::GenericError(format!("keychain task panicked: {}", e)))?
            .fs_context("updating keychain search list with", &keychain.path)?;

        log::info!("✓ Created ephemeral keychain {}", keychain.path.display());
        Ok(keychain)
    }

    /// Keychain file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tears the keychain down off the async runtime.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        let security = self.security.clone();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || teardown(&security, &path))
            .await
            .map_err(|e| Error::GenericError(format!("keychain task panicked: {}", e)))?
            .fs_context("deleting keychain", &self.path)
    }

    async fn import(&self, tools: &ToolSet, dir: &Path, signing: &SigningCredentials) -> Result<()> {
        let mut p12 = tempfile::Builder::new()
            .prefix("certificate")
            .suffix(".p12")
            .tempfile_in(dir)
            .fs_context("creating temporary certificate in", dir)?;
        p12.write_all(&signing.certificate)
            .and_then(|_| p12.flush())
            .fs_context("writing temporary certificate", p12.path())?;

        let result = tools
            .run(
                "security",
                [
                    "import",
                    path_arg(p12.path())?,
                    "-k",
                    path_arg(&self.path)?,
                    "-P",
                    signing.certificate_password.as_str(),
                    "-T",
                    "/usr/bin/codesign",
                    "-T",
                    "/usr/bin/security",
                ],
            )
            .await;

        // Remove the certificate before looking at the result.
        drop(p12);
        result.map(|_| ()).map_err(trust_error)
    }
}

impl Drop for EphemeralKeychain {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = teardown(&self.security, &self.path) {
            log::warn!("{}", e);
        }
    }
}

/// Removes `keychain` from the search list and deletes it.
fn teardown(security: &Path, keychain: &Path) -> std::io::Result<()> {
    let ours = keychain.to_path_buf();
    if let Err(e) = edit_search_list(security, |list| list.retain(|p| p != &ours)) {
        log::warn!("Failed to restore keychain search list: {}", e);
    }

    let mut cmd = Command::new(security);
    cmd.arg("delete-keychain")
        .arg(keychain)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    match run_bounded(cmd)? {
        true => {
            log::debug!("Deleted keychain {}", keychain.display());
            Ok(())
        }
        false => Err(std::io::Error::other(format!(
            "security delete-keychain failed for {}",
            keychain.display()
        ))),
    }
}

/// Applies `edit` to the user keychain search list.
fn edit_search_list(security: &Path, edit: impl FnOnce(&mut Vec<PathBuf>)) -> std::io::Result<()> {
    let _guard = SEARCH_LIST_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let output = Command::new(security)
        .args(["list-keychains", "-d", "user"])
        .stdin(Stdio::null())
        .output()?;
    let mut list = parse_search_list(&String::from_utf8_lossy(&output.stdout));
    edit(&mut list);

    let mut cmd = Command::new(security);
    cmd.args(["list-keychains", "-d", "user", "-s"])
        .args(&list)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    match run_bounded(cmd)? {
        true => Ok(()),
        false => Err(std::io::Error::other("security list-keychains failed")),
    }
}

/// Parses `security list-keychains` output (one quoted path per line).
fn parse_search_list(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .map(|l| l.trim().trim_matches('"'))
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Runs a teardown command, killing it after [`TEARDOWN_TIMEOUT`].
fn run_bounded(mut cmd: Command) -> std::io::Result<bool> {
    let mut child = cmd.spawn()?;
    match child.wait_timeout(TEARDOWN_TIMEOUT)? {
        Some(status) => Ok(status.success()),
        None => {
            child.kill()?;
            child.wait()?;
            Ok(false)
        }
    }
}
