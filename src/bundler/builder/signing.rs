//! Signing and notarization credentials.
//!
//! Credentials are read once from the environment for CI/CD and handed to
//! each macOS job as opaque values. Nothing here touches a keychain: every job
//! imports the certificate into its own ephemeral keychain (see
//! `platform::macos::keychain`) and tears it down when the job ends.

use crate::bundler::{Error, Result};
use std::path::PathBuf;

/// Code signing material for macOS jobs.
#[derive(Clone)]
pub struct SigningCredentials {
    /// PKCS#12 certificate bytes (decoded `APPLE_CERTIFICATE`)
    pub certificate: Vec<u8>,
    /// Password of the PKCS#12 bundle
    pub certificate_password: String,
    /// Signing identity, e.g. "Developer ID Application: Name (TEAMID)"
    pub identity: String,
}

impl std::fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("certificate", &format!("<{} bytes>", self.certificate.len()))
            .field("certificate_password", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Authentication for `xcrun notarytool`.
#[derive(Clone)]
pub enum NotarizationAuth {
    /// App Store Connect API key
    ApiKey {
        /// Key identifier
        key_id: String,
        /// Issuer UUID
        issuer: String,
        /// Path to the `.p8` private key
        key_path: PathBuf,
    },
    /// Apple ID with an app-specific password
    AppleId {
        /// Apple ID e-mail
        apple_id: String,
        /// App-specific password
        password: String,
        /// Developer team identifier
        team_id: String,
    },
}

impl std::fmt::Debug for NotarizationAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotarizationAuth::ApiKey { key_id, issuer, .. } => f
                .debug_struct("ApiKey")
                .field("key_id", key_id)
                .field("issuer", issuer)
                .finish_non_exhaustive(),
            NotarizationAuth::AppleId { apple_id, team_id, .. } => f
                .debug_struct("AppleId")
                .field("apple_id", apple_id)
                .field("team_id", team_id)
                .finish_non_exhaustive(),
        }
    }
}

impl NotarizationAuth {
    /// `notarytool` arguments selecting these credentials.
    pub fn notarytool_args(&self) -> Vec<String> {
        match self {
            NotarizationAuth::ApiKey {
                key_id,
                issuer,
                key_path,
            } => vec![
                "--key".into(),
                key_path.display().to_string(),
                "--key-id".into(),
                key_id.clone(),
                "--issuer".into(),
                issuer.clone(),
            ],
            NotarizationAuth::AppleId {
                apple_id,
                password,
                team_id,
            } => vec![
                "--apple-id".into(),
                apple_id.clone(),
                "--password".into(),
                password.clone(),
                "--team-id".into(),
                team_id.clone(),
            ],
        }
    }
}

/// Everything a macOS job needs to produce a trusted disk image.
#[derive(Clone, Debug)]
pub struct MacCredentials {
    /// Code signing material
    pub signing: SigningCredentials,
    /// Notarization account
    pub notarization: NotarizationAuth,
}

/// Load macOS credentials from environment variables.
///
/// - `APPLE_CERTIFICATE`: Base64-encoded .p12 certificate
/// - `APPLE_CERTIFICATE_PASSWORD`: its password
/// - `APPLE_SIGNING_IDENTITY`: identity, unless configured in the manifest
/// - `APPLE_API_KEY`, `APPLE_API_ISSUER`, `APPLE_API_KEY_PATH`: API key auth
/// - `APPLE_ID`, `APPLE_PASSWORD`, `APPLE_TEAM_ID`: Apple ID auth
///
/// Returns `Ok(None)` when no certificate is configured; macOS targets then
/// fail with a trust error while the other targets proceed.
pub fn load_mac_credentials(configured_identity: Option<&str>) -> Result<Option<MacCredentials>> {
    let (Ok(cert_b64), Ok(password)) = (
        std::env::var("APPLE_CERTIFICATE"),
        std::env::var("APPLE_CERTIFICATE_PASSWORD").map(|p| p.trim().to_string()),
    ) else {
        log::debug!("APPLE_CERTIFICATE not set - macOS targets cannot be signed");
        return Ok(None);
    };

    use base64::Engine;
    let certificate = base64::engine::general_purpose::STANDARD
        .decode(cert_b64.trim())
        .map_err(|e| {
            Error::Signing(format!("Invalid APPLE_CERTIFICATE (not valid base64): {}", e))
        })?;

    let identity = configured_identity
        .map(str::to_string)
        .or_else(|| std::env::var("APPLE_SIGNING_IDENTITY").ok())
        .ok_or_else(|| {
            Error::Signing(
                "no signing identity: set [package.metadata.bundle.macos] signing_identity \
                 or APPLE_SIGNING_IDENTITY"
                    .into(),
            )
        })?;

    let notarization = notarization_auth_from_env().ok_or_else(|| {
        Error::Signing(
            "no notarization credentials: set APPLE_API_KEY/APPLE_API_ISSUER/APPLE_API_KEY_PATH \
             or APPLE_ID/APPLE_PASSWORD/APPLE_TEAM_ID"
                .into(),
        )
    })?;

    log::info!("✓ Loaded macOS signing credentials for {}", identity);

    Ok(Some(MacCredentials {
        signing: SigningCredentials {
            certificate,
            certificate_password: password,
            identity,
        },
        notarization,
    }))
}

fn notarization_auth_from_env() -> Option<NotarizationAuth> {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    if let (Some(key_id), Some(issuer), Some(key_path)) = (
        var("APPLE_API_KEY"),
        var("APPLE_API_ISSUER"),
        var("APPLE_API_KEY_PATH"),
    ) {
        return Some(NotarizationAuth::ApiKey {
            key_id,
            issuer,
            key_path: PathBuf::from(key_path),
        });
    }

    match (var("APPLE_ID"), var("APPLE_PASSWORD"), var("APPLE_TEAM_ID")) {
        (Some(apple_id), Some(password), Some(team_id)) => Some(NotarizationAuth::AppleId {
            apple_id,
            password,
            team_id,
        }),
        _ => None,
    }
}
