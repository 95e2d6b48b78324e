//! Per-target outcomes and the aggregated batch report.

use std::fmt;

use crate::domain::types::TargetPath;

/// Terminal status of one signing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureStatus {
    /// Signature present and chained to a recognized root authority.
    Trusted,
    /// Signature present but the root is not a recognized authority.
    SelfSigned,
    /// No signature found, or the signature failed verification.
    InvalidOrUnsigned,
    /// The tool could not run, timed out, or produced unrecognizable output.
    ToolError,
    /// The task was skipped because the password prompt was cancelled.
    Skipped,
}

impl SignatureStatus {
    /// All statuses in summary display order.
    pub const ALL: &'static [SignatureStatus] = &[
        SignatureStatus::Trusted,
        SignatureStatus::SelfSigned,
        SignatureStatus::InvalidOrUnsigned,
        SignatureStatus::ToolError,
        SignatureStatus::Skipped,
    ];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SignatureStatus::Trusted => "trusted signature",
            SignatureStatus::SelfSigned => "self-signed certificate",
            SignatureStatus::InvalidOrUnsigned => "unsigned or invalid signature",
            SignatureStatus::ToolError => "tool error",
            SignatureStatus::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            SignatureStatus::Trusted => "✓",
            SignatureStatus::SelfSigned => "⚠",
            SignatureStatus::InvalidOrUnsigned => "✗",
            SignatureStatus::ToolError => "✗",
            SignatureStatus::Skipped => "-",
        }
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Result of one execution task, produced exactly once per target.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub target: TargetPath,
    pub status: SignatureStatus,
    /// Exit code of the final tool invocation, when the tool ran at all.
    pub exit_code: Option<i32>,
    /// `Issued to:` field parsed from the tool output.
    pub signer: Option<String>,
    /// `Issued by:` field parsed from the tool output.
    pub issuer: Option<String>,
    /// Timestamp line parsed from the tool output.
    pub timestamp: Option<String>,
    /// Truncated excerpt of the raw tool output; never contains secrets
    /// because passwords are only passed as process arguments.
    pub raw_excerpt: String,
    /// Human-readable reason for error or skipped statuses.
    pub reason: Option<String>,
    /// Number of tool invocations this outcome took (1, or 2 after fallback).
    pub attempts: u32,
}

impl Outcome {
    /// An outcome for a task that never ran its tool.
    #[must_use]
    pub fn skipped(target: TargetPath, reason: impl Into<String>) -> Self {
        Outcome {
            target,
            status: SignatureStatus::Skipped,
            exit_code: None,
            signer: None,
            issuer: None,
            timestamp: None,
            raw_excerpt: String::new(),
            reason: Some(reason.into()),
            attempts: 0,
        }
    }

    /// An outcome for a task whose tool could not run or be understood.
    #[must_use]
    pub fn tool_error(target: TargetPath, reason: impl Into<String>, attempts: u32) -> Self {
        Outcome {
            target,
            status: SignatureStatus::ToolError,
            exit_code: None,
            signer: None,
            issuer: None,
            timestamp: None,
            raw_excerpt: String::new(),
            reason: Some(reason.into()),
            attempts,
        }
    }
}

/// Per-status counters for a finished or in-progress batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub trusted: usize,
    pub self_signed: usize,
    pub invalid_or_unsigned: usize,
    pub tool_error: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: SignatureStatus) {
        match status {
            SignatureStatus::Trusted => self.trusted += 1,
            SignatureStatus::SelfSigned => self.self_signed += 1,
            SignatureStatus::InvalidOrUnsigned => self.invalid_or_unsigned += 1,
            SignatureStatus::ToolError => self.tool_error += 1,
            SignatureStatus::Skipped => self.skipped += 1,
        }
    }

    #[must_use]
    pub fn get(&self, status: SignatureStatus) -> usize {
        match status {
            SignatureStatus::Trusted => self.trusted,
            SignatureStatus::SelfSigned => self.self_signed,
            SignatureStatus::InvalidOrUnsigned => self.invalid_or_unsigned,
            SignatureStatus::ToolError => self.tool_error,
            SignatureStatus::Skipped => self.skipped,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.trusted + self.self_signed + self.invalid_or_unsigned + self.tool_error + self.skipped
    }
}

/// Final report of a batch run: outcomes in completion order plus counters.
#[derive(Debug, Clone)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
    pub counts: StatusCounts,
}

impl Report {
    /// Every target ends with exactly one status, so the counter total must
    /// equal the number of outcomes.
    #[must_use]
    pub fn reconciles(&self, target_count: usize) -> bool {
        self.outcomes.len() == target_count && self.counts.total() == target_count
    }
}
