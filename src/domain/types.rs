//! Type-safe wrappers using the new-type pattern.
//!
//! Validated inputs for the orchestration engine: signable target paths,
//! timestamp authority URLs, and PFX passwords that never leak into logs.

use crate::infra::error::{SignError, SignResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File extensions the engine accepts as signing targets.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "exe", "dll", "sys", "msi", "cab", "cat", "ocx", "ps1", "psm1", "psd1", "js", "vbs", "wsf",
];

/// A path to a signable file with a supported extension.
///
/// Paths are carried as `PathBuf` end to end and handed to the child process
/// as a single argument, so arbitrary Unicode, spaces, and shell
/// metacharacters are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetPath(PathBuf);

impl TargetPath {
    /// Create a new `TargetPath` after checking the extension policy.
    pub fn new(path: impl Into<PathBuf>) -> SignResult<Self> {
        let path = path.into();
        Self::validate_extension(&path)?;
        Ok(TargetPath(path))
    }

    /// Get the underlying path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// File name portion for display purposes, lossy for non-UTF-8 names.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.to_string_lossy().into_owned())
    }

    /// Check whether a path carries one of the supported extensions.
    #[must_use]
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let lower = e.to_ascii_lowercase();
                SUPPORTED_EXTENSIONS.contains(&lower.as_str())
            })
            .unwrap_or(false)
    }

    fn validate_extension(path: &Path) -> SignResult<()> {
        if Self::is_supported(path) {
            Ok(())
        } else {
            Err(SignError::ValidationError(format!(
                "Unsupported file type: {} (supported: {})",
                path.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            )))
        }
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Type-safe wrapper for timestamp authority URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampUrl(String);

impl TimestampUrl {
    /// Create a new `TimestampUrl` after validation.
    pub fn new(url: impl AsRef<str>) -> SignResult<Self> {
        let url = url.as_ref();
        Self::validate_url(url)?;
        Ok(TimestampUrl(url.to_string()))
    }

    /// Get the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that the URL is reasonable for timestamping.
    fn validate_url(url: &str) -> SignResult<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SignError::ValidationError(format!(
                "Timestamp URL must start with http:// or https://, got: {url}"
            )));
        }

        if url.len() <= 8 {
            return Err(SignError::ValidationError(
                "Timestamp URL too short".to_string(),
            ));
        }

        let suspicious_patterns = ["javascript:", "file:", "data:"];
        for pattern in &suspicious_patterns {
            if url.contains(pattern) {
                return Err(SignError::ValidationError(format!(
                    "Timestamp URL contains suspicious pattern '{pattern}': {url}"
                )));
            }
        }

        // Basic domain validation - the host must contain at least one dot
        let without_protocol = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap();
        if !without_protocol.contains('.') {
            return Err(SignError::ValidationError(format!(
                "Timestamp URL must contain a valid domain: {url}"
            )));
        }

        Ok(())
    }
}

impl FromStr for TimestampUrl {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TimestampUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe wrapper for PFX passwords.
///
/// The value is only reachable through `as_str`; `Display` and `Debug` are
/// redacted so the secret cannot end up in logs or outcome excerpts.
#[derive(Clone, PartialEq, Eq)]
pub struct PfxPassword(String);

impl PfxPassword {
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        PfxPassword(password.into())
    }

    /// Get the password for handing to the signing tool.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the password is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PfxPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[PASSWORD REDACTED]")
    }
}

impl fmt::Debug for PfxPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PfxPassword([REDACTED])")
    }
}
