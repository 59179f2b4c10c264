//! Code signing with `codesign`.

use super::trust_error;
use crate::bundler::{
    error::{Error, Result},
    utils::process::{ToolSet, path_arg},
};
use std::path::Path;

/// Signs with one identity from one ephemeral keychain.
#[derive(Clone, Copy, Debug)]
pub struct Signer<'a> {
    /// Tool resolution
    pub tools: &'a ToolSet,
    /// Keychain holding the identity
    pub keychain: &'a Path,
    /// Signing identity
    pub identity: &'a str,
    /// Optional entitlements plist
    pub entitlements: Option<&'a Path>,
}

impl Signer<'_> {
    /// Deep-signs an application bundle with hardened runtime and a secure
    /// timestamp, then verifies the signature.
    pub async fn sign_app(&self, app: &Path) -> Result<()> {
        log::info!("Signing {}", app.display());

        let mut args = vec![
            "--force",
            "--deep",
            "--options",
            "runtime",
            "--timestamp",
            "--keychain",
            path_arg(self.keychain)?,
            "--sign",
            self.identity,
        ];
        if let Some(entitlements) = self.entitlements {
            if !entitlements.is_file() {
                return Err(Error::MissingTemplate(entitlements.to_path_buf()));
            }
            args.push("--entitlements");
            args.push(path_arg(entitlements)?);
        }
        args.push(path_arg(app)?);

        self.tools
            .run("codesign", &args)
            .await
            .map_err(trust_error)?;
        self.verify(app).await?;

        log::info!("✓ Signed {}", app.display());
        Ok(())
    }

    /// Signs a disk image, then verifies the signature.
    pub async fn sign_image(&self, dmg: &Path) -> Result<()> {
        log::info!("Signing {}", dmg.display());

        self.tools
            .run(
                "codesign",
                [
                    "--force",
                    "--timestamp",
                    "--keychain",
                    path_arg(self.keychain)?,
                    "--sign",
                    self.identity,
                    path_arg(dmg)?,
                ],
            )
            .await
            .map_err(trust_error)?;
        self.verify(dmg).await?;

        log::info!("✓ Signed {}", dmg.display());
        Ok(())
    }

    /// Verifies a signature strictly.
    pub async fn verify(&self, path: &Path) -> Result<()> {
        self.tools
            .run(
                "codesign",
                ["--verify", "--deep", "--strict", "--verbose=2", path_arg(path)?],
            )
            .await
            .map_err(|e| Error::Signing(format!("signature of {} does not verify: {}", path.display(), e)))?;
        Ok(())
    }
}
