//! Batch Code-Signing Orchestration Engine
//!
//! Orchestrates external code-signing tools (certificate creation, PFX
//! packaging, signing, timestamping, verification) across a batch of files.
//! Local-only operations fan out over a bounded worker pool; anything that
//! talks to a timestamp authority runs strictly sequentially to respect TSA
//! rate limits. The engine delegates all cryptography to the external tools
//! and only interprets their exit codes and textual output.

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use adapters::{NoPrompt, PasswordPrompt, StdinPrompt, SystemInvoker, ToolInvoker, ToolOutput};
pub use domain::{
    CertificateRef, CertificateRequest, ConcurrencyClass, Operation, Outcome, PfxPassword, Report,
    SignatureStatus, StatusCounts, TargetPath, TimestampUrl, SUPPORTED_EXTENSIONS,
};
pub use infra::{BatchConfiguration, ConfigManager, SignError, SignResult};
pub use pipelines::{BatchExecutor, BatchWorkflow, ExecutorConfig};
pub use services::{
    CertificateGenerator, CredentialCache, ExecutionTask, NullSink, OutcomeSink, ReportAggregator,
    Toolchain, ToolKind,
};
