//! Pure classification of signing tool output.
//!
//! All pattern matching on signtool's human-readable output lives here, away
//! from process execution, so the rules stay testable with plain strings.
//! Input is the structured `(exit code, stdout, stderr)` triple; output is a
//! tagged status plus best-effort extracted fields.

use std::sync::Arc;

use crate::adapters::invoker::ToolOutput;
use crate::domain::operation::Operation;
use crate::domain::outcome::SignatureStatus;

/// Certificate authorities treated as recognized roots when they appear in
/// the issuer line.
const RECOGNIZED_AUTHORITIES: &[&str] = &[
    "Microsoft Corporation",
    "Microsoft Code Signing",
    "Microsoft Windows",
    "Windows Verified Publisher",
    "DigiCert",
    "VeriSign",
    "Symantec",
    "GlobalSign",
    "Sectigo",
    "Comodo",
    "Thawte",
    "GeoTrust",
];

/// Structured result of classifying one tool invocation.
#[derive(Debug, Clone)]
pub struct Classification {
    pub status: SignatureStatus,
    pub signer: Option<String>,
    pub issuer: Option<String>,
    pub timestamp: Option<String>,
    /// Populated for `ToolError`, naming what went wrong.
    pub reason: Option<String>,
}

/// Decides whether a failed invocation failed on the timestamp step rather
/// than the signing step. The exact convention is tool-specific, so the
/// executor takes this as a pluggable predicate.
pub type TimestampFailurePredicate = Arc<dyn Fn(&ToolOutput) -> bool + Send + Sync>;

/// Default predicate: the failure output talks about the timestamp operation
/// or the timestamp server.
#[must_use]
pub fn default_timestamp_failure_predicate() -> TimestampFailurePredicate {
    Arc::new(|output: &ToolOutput| {
        let text = output.combined().to_lowercase();
        text.contains("timestamp")
    })
}

/// Whether tool output points at a password problem (missing or rejected).
#[must_use]
pub fn indicates_password_problem(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["password", "pfx", "pass"].iter().any(|k| lower.contains(k))
}

/// Extract `Issued to:` / `Issued by:` / timestamp lines from verbose output.
fn extract_fields(text: &str) -> (Option<String>, Option<String>, Option<String>) {
    let mut signer = None;
    let mut issuer = None;
    let mut timestamp = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Issued to:") {
            if signer.is_none() {
                signer = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix("Issued by:") {
            if issuer.is_none() {
                issuer = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = line
            .strip_prefix("Timestamped:")
            .or_else(|| line.strip_prefix("The signature is timestamped:"))
            .or_else(|| line.strip_prefix("Timestamp:"))
        {
            if timestamp.is_none() {
                timestamp = Some(rest.trim().to_string());
            }
        }
    }

    (signer, issuer, timestamp)
}

fn issuer_is_recognized(issuer: &str) -> bool {
    let lower = issuer.to_lowercase();
    RECOGNIZED_AUTHORITIES
        .iter()
        .any(|k| lower.contains(&k.to_lowercase()))
}

/// Map one finished tool invocation to a signature status plus fields.
///
/// Deterministic and total: output that matches no known pattern becomes
/// `ToolError` rather than a guessed trust status.
#[must_use]
pub fn classify(operation: Operation, output: &ToolOutput) -> Classification {
    let text = output.combined();
    let (signer, issuer, timestamp) = extract_fields(&text);

    let status;
    let mut reason = None;

    if text.contains("SignTool Error: No signature found") {
        status = SignatureStatus::InvalidOrUnsigned;
    } else if text.contains("terminated in a root certificate which is not trusted") {
        status = SignatureStatus::SelfSigned;
    } else if text.contains("SignTool Error") && !text.contains("Number of errors") {
        status = SignatureStatus::InvalidOrUnsigned;
    } else if text.contains("Successfully verified")
        || text.contains("Number of files successfully Verified: 1")
    {
        status = SignatureStatus::Trusted;
    } else if output.success()
        && (text.contains("Successfully signed") || text.contains("Successfully timestamped"))
    {
        // A completed sign or timestamp run; trust level comes from the
        // certificate chain printed by the verbose output, when present.
        status = match (&signer, &issuer) {
            (Some(s), Some(i)) if s == i => SignatureStatus::SelfSigned,
            (_, Some(i)) if issuer_is_recognized(i) => SignatureStatus::Trusted,
            (_, Some(_)) => SignatureStatus::SelfSigned,
            (_, None) if operation == Operation::TimestampOnly => SignatureStatus::Trusted,
            (_, None) => SignatureStatus::SelfSigned,
        };
    } else if output.success() && signer.is_some() && issuer.is_some() {
        // Verbose output without an explicit success banner; fall back to the
        // chain heuristic used for sign output.
        let s = signer.as_deref().unwrap();
        let i = issuer.as_deref().unwrap();
        status = if s == i || !issuer_is_recognized(i) {
            SignatureStatus::SelfSigned
        } else {
            SignatureStatus::Trusted
        };
    } else {
        status = SignatureStatus::ToolError;
        reason = Some(format!(
            "Unrecognized tool output (exit {})",
            output
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "killed".to_string())
        ));
    }

    Classification {
        status,
        signer,
        issuer,
        timestamp,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit: i32, text: &str) -> ToolOutput {
        ToolOutput {
            exit_code: Some(exit),
            stdout: text.to_string(),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_unsigned_file() {
        let out = output(1, "SignTool Error: No signature found.");
        let c = classify(Operation::Verify, &out);
        assert_eq!(c.status, SignatureStatus::InvalidOrUnsigned);
    }

    #[test]
    fn test_untrusted_root_is_self_signed() {
        let out = output(
            1,
            "SignTool Error: A certificate chain processed, but terminated in a root certificate which is not trusted by the trust provider.",
        );
        let c = classify(Operation::Verify, &out);
        assert_eq!(c.status, SignatureStatus::SelfSigned);
    }

    #[test]
    fn test_trusted_verification_with_fields() {
        let text = "\
Verifying: app.exe
Signing Certificate Chain:
    Issued to: Contoso Ltd
    Issued by: DigiCert Trusted Root G4
The signature is timestamped: Mon Mar 03 10:00:00 2025
Successfully verified: app.exe
";
        let c = classify(Operation::Verify, &output(0, text));
        assert_eq!(c.status, SignatureStatus::Trusted);
        assert_eq!(c.signer.as_deref(), Some("Contoso Ltd"));
        assert_eq!(c.issuer.as_deref(), Some("DigiCert Trusted Root G4"));
        assert_eq!(c.timestamp.as_deref(), Some("Mon Mar 03 10:00:00 2025"));
    }

    #[test]
    fn test_other_signtool_error_is_invalid() {
        let out = output(1, "SignTool Error: The file is corrupt.");
        let c = classify(Operation::Verify, &out);
        assert_eq!(c.status, SignatureStatus::InvalidOrUnsigned);
    }

    #[test]
    fn test_sign_success_with_self_signed_chain() {
        let text = "\
Issued to: My Test Cert
Issued by: My Test Cert
Successfully signed: app.exe
";
        let c = classify(Operation::SignOnly, &output(0, text));
        assert_eq!(c.status, SignatureStatus::SelfSigned);
    }

    #[test]
    fn test_sign_success_with_recognized_issuer() {
        let text = "\
Issued to: Contoso Ltd
Issued by: Sectigo Public Code Signing CA
Successfully signed: app.exe
";
        let c = classify(Operation::SignOnly, &output(0, text));
        assert_eq!(c.status, SignatureStatus::Trusted);
    }

    #[test]
    fn test_timestamp_only_success() {
        let c = classify(
            Operation::TimestampOnly,
            &output(0, "Successfully timestamped: app.exe"),
        );
        assert_eq!(c.status, SignatureStatus::Trusted);
    }

    #[test]
    fn test_ambiguous_output_is_tool_error() {
        let c = classify(Operation::Verify, &output(3, "segfault in module"));
        assert_eq!(c.status, SignatureStatus::ToolError);
        assert!(c.reason.unwrap().contains("exit 3"));
    }

    #[test]
    fn test_password_predicates() {
        assert!(indicates_password_problem(
            "SignTool Error: The specified PFX password is not correct."
        ));
        assert!(!indicates_password_problem("SignTool Error: file not found"));
    }

    #[test]
    fn test_default_timestamp_predicate() {
        let pred = default_timestamp_failure_predicate();
        assert!(pred(&output(
            1,
            "SignTool Error: The specified timestamp server either could not be reached"
        )));
        assert!(!pred(&output(1, "SignTool Error: No certificates were found")));
    }
}
