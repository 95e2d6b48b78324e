//! Certificate and PFX generation via the external tool pipeline.
//!
//! Drives `makecert` → `cert2spc` → `pvk2pfx` inside a scratch directory and
//! copies the results to the requested output paths. A batch run that
//! references a generated certificate calls this before planning, so the PFX
//! exists on disk before any task dispatches.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::invoker::{ToolInvoker, ToolOutput};
use crate::domain::operation::CertificateRequest;
use crate::infra::error::{SignError, SignResult};
use crate::services::toolchain::{ToolKind, Toolchain};

const WRONG_KEY_PASSWORD: &str = "ERROR: Password incorrect or PVK file corrupted.";

pub struct CertificateGenerator {
    toolchain: Toolchain,
    invoker: Arc<dyn ToolInvoker>,
    timeout: Duration,
}

impl CertificateGenerator {
    #[must_use]
    pub fn new(toolchain: Toolchain, invoker: Arc<dyn ToolInvoker>, timeout: Duration) -> Self {
        CertificateGenerator {
            toolchain,
            invoker,
            timeout,
        }
    }

    /// Generate a self-signed certificate and PFX per the request.
    ///
    /// Scratch files (`name.pvk`, `name.cer`, `name.spc`) live in a temp
    /// directory that is removed when this returns.
    pub async fn generate(&self, request: &CertificateRequest) -> SignResult<()> {
        self.toolchain.ensure_present(ToolKind::CERT_GENERATION)?;

        let scratch = tempfile::TempDir::new()?;
        let pvk = scratch.path().join("name.pvk");
        let cer = scratch.path().join("name.cer");
        let spc = scratch.path().join("name.spc");

        let subject = match &request.email {
            Some(email) if !email.is_empty() => {
                format!("CN={}+EMAIL={}", request.subject_name, email)
            }
            _ => format!("CN={}", request.subject_name),
        };

        log::info!("Generating self-signed certificate for {subject}");

        // makecert pops its own key-protection dialog on Windows; the
        // invoker only suppresses the console window.
        let args: Vec<OsString> = vec![
            "-sv".into(),
            pvk.clone().into_os_string(),
            "-r".into(),
            "-n".into(),
            subject.into(),
            cer.clone().into_os_string(),
        ];
        let output = self.run(ToolKind::MakeCert, &args).await?;
        Self::expect_success(ToolKind::MakeCert, &output)?;

        let args: Vec<OsString> = vec![cer.clone().into_os_string(), spc.clone().into_os_string()];
        let output = self.run(ToolKind::Cert2Spc, &args).await?;
        Self::expect_success(ToolKind::Cert2Spc, &output)?;

        if let Some(parent) = request.pfx_output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut args: Vec<OsString> = vec!["-pvk".into(), pvk.into_os_string()];
        if let Some(password) = &request.password {
            if !password.is_empty() {
                args.push("-pi".into());
                args.push(password.as_str().into());
            }
        }
        args.extend([
            OsString::from("-spc"),
            spc.into_os_string(),
            OsString::from("-pfx"),
            request.pfx_output.clone().into_os_string(),
            OsString::from("-f"),
        ]);
        let output = self.run(ToolKind::Pvk2Pfx, &args).await?;
        if output.combined().contains(WRONG_KEY_PASSWORD) {
            return Err(SignError::CertificateError(
                "Key password incorrect or PVK file corrupted".to_string(),
            ));
        }
        Self::expect_success(ToolKind::Pvk2Pfx, &output)?;

        if let Some(cer_output) = &request.cer_output {
            if let Some(parent) = cer_output.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::copy(&cer, cer_output).await?;
        }

        log::info!(
            "Certificate materialized at {}",
            request.pfx_output.display()
        );
        Ok(())
    }

    async fn run(&self, kind: ToolKind, args: &[OsString]) -> SignResult<ToolOutput> {
        let exe = self.toolchain.resolve(kind);
        self.invoker.run(&exe, args, self.timeout).await
    }

    fn expect_success(kind: ToolKind, output: &ToolOutput) -> SignResult<()> {
        if output.success() {
            Ok(())
        } else {
            let excerpt: String = output.combined().chars().take(300).collect();
            Err(SignError::CertificateError(format!(
                "{} failed (exit {:?}): {}",
                kind.exe_name(),
                output.exit_code,
                excerpt.trim()
            )))
        }
    }
}
