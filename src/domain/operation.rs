//! Batch operations and their concurrency classes.

use std::path::PathBuf;

use crate::domain::types::PfxPassword;

/// The operation a batch run performs on every target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Verify existing signatures, no credential needed.
    Verify,
    /// Sign without timestamping.
    SignOnly,
    /// Sign and timestamp (RFC 3161 first, legacy `/t` fallback).
    SignAndTimestamp,
    /// Timestamp an already signed file.
    TimestampOnly,
}

/// How tasks of an operation may be scheduled relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyClass {
    /// Worker-pool fan-out; tasks touch only local resources.
    Parallel,
    /// Strictly one task at a time; timestamp authorities rate-limit bursts.
    Sequential,
}

impl Operation {
    /// The scheduling class for this operation.
    ///
    /// Anything that talks to a timestamp authority runs sequentially so the
    /// engine never bursts requests at a rate-limited TSA.
    #[must_use]
    pub fn concurrency_class(&self) -> ConcurrencyClass {
        match self {
            Operation::Verify | Operation::SignOnly => ConcurrencyClass::Parallel,
            Operation::SignAndTimestamp | Operation::TimestampOnly => ConcurrencyClass::Sequential,
        }
    }

    /// Whether tasks of this operation need a PFX credential.
    #[must_use]
    pub fn needs_certificate(&self) -> bool {
        matches!(self, Operation::SignOnly | Operation::SignAndTimestamp)
    }

    /// Whether tasks of this operation contact a timestamp authority.
    #[must_use]
    pub fn uses_timestamp_server(&self) -> bool {
        matches!(self, Operation::SignAndTimestamp | Operation::TimestampOnly)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Verify => "verify",
            Operation::SignOnly => "sign",
            Operation::SignAndTimestamp => "sign+timestamp",
            Operation::TimestampOnly => "timestamp",
        }
    }
}

/// Request to generate a fresh self-signed certificate and PFX container.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    /// Subject common name.
    pub subject_name: String,
    /// Optional email merged into the subject.
    pub email: Option<String>,
    /// Where the generated `.pfx` lands.
    pub pfx_output: PathBuf,
    /// Optional copy of the `.cer` alongside.
    pub cer_output: Option<PathBuf>,
    /// Password protecting the generated private key, if any.
    pub password: Option<PfxPassword>,
}

/// Certificate input for a batch run: an existing PFX or a generation request.
#[derive(Debug, Clone)]
pub enum CertificateRef {
    ExistingPfx(PathBuf),
    Generate(CertificateRequest),
}

impl CertificateRef {
    /// The PFX path tasks will reference once the certificate is materialized.
    #[must_use]
    pub fn pfx_path(&self) -> &PathBuf {
        match self {
            CertificateRef::ExistingPfx(path) => path,
            CertificateRef::Generate(req) => &req.pfx_output,
        }
    }
}
