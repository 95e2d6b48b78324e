//! Direct process execution backend for the tool invoker seam.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::adapters::invoker::{ToolInvoker, ToolOutput};
use crate::infra::error::{SignError, SignResult};

/// Runs signing tools as real child processes via `tokio::process`.
///
/// No shell is involved at any point; each argument is handed to the OS as
/// its own vector element, which keeps Unicode paths and embedded spaces
/// intact and rules out injection.
#[derive(Debug, Default, Clone)]
pub struct SystemInvoker;

impl SystemInvoker {
    #[must_use]
    pub fn new() -> Self {
        SystemInvoker
    }
}

#[async_trait]
impl ToolInvoker for SystemInvoker {
    async fn run(
        &self,
        executable: &Path,
        args: &[OsString],
        timeout: Duration,
    ) -> SignResult<ToolOutput> {
        let tool_name = executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| executable.to_string_lossy().into_owned());

        let mut command = Command::new(executable);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Keep the signing tools from flashing console windows.
        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        log::debug!("Running {tool_name} with {} argument(s)", args.len());

        let child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                SignError::LaunchFailed(format!("{}: {e}", executable.display()))
            }
            _ => SignError::IoError(e.to_string()),
        })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| SignError::IoError(e.to_string()))?,
            Err(_) => {
                // kill_on_drop reaps the child once the future is dropped.
                log::warn!("{tool_name} exceeded {}s timeout, killing", timeout.as_secs());
                return Err(SignError::TimedOut {
                    tool: tool_name,
                    seconds: timeout.as_secs(),
                });
            }
        };

        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
