//! Tool invocation seam.
//!
//! The engine never runs external binaries directly; everything goes through
//! the [`ToolInvoker`] trait so the batch executor and the certificate
//! generator can be exercised against scripted invokers in tests.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use crate::infra::error::SignResult;

/// Captured result of one external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout and stderr joined, the way signtool output is pattern-matched.
    #[must_use]
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs one external signing binary with an argument vector.
///
/// Contract: arguments are passed as a vector, never concatenated into a
/// shell string; the child must not open a window or inherit a console.
/// Launch failures and timeouts are errors (`LaunchFailed` / `TimedOut`),
/// distinct from a nonzero exit code which is an ordinary `ToolOutput`.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn run(
        &self,
        executable: &Path,
        args: &[OsString],
        timeout: Duration,
    ) -> SignResult<ToolOutput>;
}
