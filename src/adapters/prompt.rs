//! Password prompt seam.
//!
//! The credential cache calls out through [`PasswordPrompt`] on a cache miss.
//! Prompting blocks only the task that needs the credential; sibling tasks in
//! a parallel batch keep running.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::types::PfxPassword;
use crate::infra::error::SignResult;

/// Collaborator that asks the user for a PFX password.
///
/// `Ok(None)` means the user cancelled; the owning task is then marked
/// skipped rather than errored.
#[async_trait]
pub trait PasswordPrompt: Send + Sync {
    async fn request_password(&self, cert_path: &Path) -> SignResult<Option<PfxPassword>>;
}

/// Prompt that reads a line from stdin, for the CLI front end.
#[derive(Debug, Default)]
pub struct StdinPrompt;

#[async_trait]
impl PasswordPrompt for StdinPrompt {
    async fn request_password(&self, cert_path: &Path) -> SignResult<Option<PfxPassword>> {
        let name = cert_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| cert_path.to_string_lossy().into_owned());

        let line = tokio::task::spawn_blocking(move || {
            use std::io::Write;
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "Enter PFX password ({name}): ");
            let _ = stderr.flush();

            let mut buf = String::new();
            match std::io::stdin().read_line(&mut buf) {
                Ok(0) => None,
                Ok(_) => Some(buf.trim_end_matches(['\r', '\n']).to_string()),
                Err(_) => None,
            }
        })
        .await
        .map_err(|e| crate::infra::error::SignError::IoError(e.to_string()))?;

        Ok(line.map(PfxPassword::new))
    }
}

/// Prompt that always cancels, for non-interactive runs.
#[derive(Debug, Default)]
pub struct NoPrompt;

#[async_trait]
impl PasswordPrompt for NoPrompt {
    async fn request_password(&self, _cert_path: &Path) -> SignResult<Option<PfxPassword>> {
        Ok(None)
    }
}
