//! In-memory credential cache for PFX passwords.
//!
//! Owned by the batch run, never a process-wide singleton. Entries live for
//! the run (or until `clear`) and are never written to disk or logged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::adapters::prompt::PasswordPrompt;
use crate::domain::types::PfxPassword;
use crate::infra::error::SignResult;

/// Passwords keyed by the exact PFX path, with prompt-on-miss semantics.
pub struct CredentialCache {
    entries: Mutex<HashMap<PathBuf, PfxPassword>>,
    prompt: Arc<dyn PasswordPrompt>,
}

impl CredentialCache {
    #[must_use]
    pub fn new(prompt: Arc<dyn PasswordPrompt>) -> Self {
        CredentialCache {
            entries: Mutex::new(HashMap::new()),
            prompt,
        }
    }

    /// Pre-populate a password, e.g. one supplied on the command line.
    pub async fn seed(&self, cert_path: impl Into<PathBuf>, password: PfxPassword) {
        self.entries.lock().await.insert(cert_path.into(), password);
    }

    /// Cached password lookup, prompting the collaborator on a miss.
    ///
    /// Returns `Ok(None)` when the prompt was cancelled. The lock stays held
    /// across the prompt, so concurrent tasks missing on the same path wait
    /// for the one in-flight prompt instead of stacking up dialogs; tasks
    /// that need no credential are never touched.
    pub async fn get_or_prompt(&self, cert_path: &Path) -> SignResult<Option<PfxPassword>> {
        let mut entries = self.entries.lock().await;
        if let Some(cached) = entries.get(cert_path) {
            return Ok(Some(cached.clone()));
        }

        match self.prompt.request_password(cert_path).await? {
            Some(password) => {
                entries.insert(cert_path.to_path_buf(), password.clone());
                Ok(Some(password))
            }
            None => Ok(None),
        }
    }

    /// Replace a cached entry after the tool rejected the old value.
    pub async fn replace(&self, cert_path: &Path, password: PfxPassword) {
        self.entries
            .lock()
            .await
            .insert(cert_path.to_path_buf(), password);
    }

    /// Reprompt for a path whose cached password turned out wrong.
    pub async fn reprompt(&self, cert_path: &Path) -> SignResult<Option<PfxPassword>> {
        let answer = self.prompt.request_password(cert_path).await?;
        if let Some(password) = &answer {
            self.replace(cert_path, password.clone()).await;
        }
        Ok(answer)
    }

    /// Purge all cached credentials.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
