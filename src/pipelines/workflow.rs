//! `BatchWorkflow`: high-level facade for one batch signing run.
//!
//! Wires the toolchain, credential cache, planner, and executor together.
//! Steps:
//! 1. Verify the needed external tools exist (`ConfigurationError` before
//!    anything dispatches)
//! 2. Materialize a generated certificate when the run asks for one
//! 3. Build the execution plan
//! 4. Run it under the operation's concurrency class and return the report

use std::sync::Arc;

use crate::adapters::invoker::ToolInvoker;
use crate::adapters::prompt::PasswordPrompt;
use crate::domain::operation::{CertificateRef, Operation};
use crate::domain::outcome::Report;
use crate::domain::types::{PfxPassword, TargetPath, TimestampUrl};
use crate::infra::config::BatchConfiguration;
use crate::infra::error::SignResult;
use crate::pipelines::batch::{BatchExecutor, ExecutorConfig};
use crate::services::certgen::CertificateGenerator;
use crate::services::credentials::CredentialCache;
use crate::services::planner;
use crate::services::report::OutcomeSink;
use crate::services::toolchain::{ToolKind, Toolchain};

pub struct BatchWorkflow {
    toolchain: Toolchain,
    invoker: Arc<dyn ToolInvoker>,
    credentials: Arc<CredentialCache>,
    timestamp_servers: Vec<TimestampUrl>,
    executor_config: ExecutorConfig,
}

impl BatchWorkflow {
    /// Build a workflow from persisted configuration plus the two external
    /// collaborators: the process backend and the password prompt.
    pub fn from_configuration(
        config: &BatchConfiguration,
        invoker: Arc<dyn ToolInvoker>,
        prompt: Arc<dyn PasswordPrompt>,
    ) -> SignResult<Self> {
        Ok(BatchWorkflow {
            toolchain: Toolchain::new(&config.tools_dir),
            invoker,
            credentials: Arc::new(CredentialCache::new(prompt)),
            timestamp_servers: config.timestamp_urls()?,
            executor_config: ExecutorConfig {
                workers: config.workers,
                task_timeout: config.task_timeout(),
            },
        })
    }

    /// The run-scoped credential cache, e.g. for seeding a password supplied
    /// on the command line.
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    /// Seed the cache for the run's certificate so no task has to prompt.
    pub async fn seed_password(&self, cert_ref: &CertificateRef, password: PfxPassword) {
        self.credentials
            .seed(cert_ref.pfx_path().clone(), password)
            .await;
    }

    /// Run one batch operation over the given targets.
    pub async fn run(
        &self,
        targets: &[TargetPath],
        operation: Operation,
        cert_ref: Option<&CertificateRef>,
        sink: Arc<dyn OutcomeSink>,
    ) -> SignResult<Report> {
        self.toolchain.ensure_for_operation(operation)?;

        // A certificate that has to be generated is fully materialized on
        // disk before any task referencing it is planned or dispatched.
        if let Some(CertificateRef::Generate(request)) = cert_ref {
            let generator = CertificateGenerator::new(
                self.toolchain.clone(),
                self.invoker.clone(),
                self.executor_config.task_timeout,
            );
            generator.generate(request).await?;
            if let Some(password) = &request.password {
                self.credentials
                    .seed(request.pfx_output.clone(), password.clone())
                    .await;
            }
        }

        let plan = planner::plan(targets, operation, cert_ref, &self.timestamp_servers)?;
        log::info!(
            "Planned {} task(s), operation {}, class {:?}",
            plan.len(),
            operation.as_str(),
            operation.concurrency_class()
        );

        let executor = BatchExecutor::new(
            self.invoker.clone(),
            self.credentials.clone(),
            self.toolchain.resolve(ToolKind::SignTool),
            self.executor_config.clone(),
        );
        Ok(executor.execute(plan, sink).await)
    }
}
