//! Resolution of the external signing binaries.
//!
//! The engine drives four fixed tools out of a configured directory. Missing
//! tools are a `ConfigurationError` reported before any task dispatches.

use std::path::{Path, PathBuf};

use crate::domain::operation::Operation;
use crate::infra::error::{SignError, SignResult};

/// The external binaries the engine knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    MakeCert,
    Cert2Spc,
    Pvk2Pfx,
    SignTool,
}

impl ToolKind {
    /// Executable file name inside the tools directory.
    #[must_use]
    pub fn exe_name(&self) -> &'static str {
        let base = match self {
            ToolKind::MakeCert => "makecert",
            ToolKind::Cert2Spc => "cert2spc",
            ToolKind::Pvk2Pfx => "pvk2pfx",
            ToolKind::SignTool => "signtool",
        };
        if cfg!(windows) {
            match self {
                ToolKind::MakeCert => "makecert.exe",
                ToolKind::Cert2Spc => "cert2spc.exe",
                ToolKind::Pvk2Pfx => "pvk2pfx.exe",
                ToolKind::SignTool => "signtool.exe",
            }
        } else {
            base
        }
    }

    /// Tools needed to generate a certificate and PFX container.
    pub const CERT_GENERATION: &'static [ToolKind] = &[
        ToolKind::MakeCert,
        ToolKind::Cert2Spc,
        ToolKind::Pvk2Pfx,
    ];
}

/// Locates signing binaries inside a configured tools directory.
#[derive(Debug, Clone)]
pub struct Toolchain {
    tools_dir: PathBuf,
}

impl Toolchain {
    #[must_use]
    pub fn new(tools_dir: impl Into<PathBuf>) -> Self {
        Toolchain {
            tools_dir: tools_dir.into(),
        }
    }

    #[must_use]
    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    /// Absolute path to one tool.
    #[must_use]
    pub fn resolve(&self, kind: ToolKind) -> PathBuf {
        self.tools_dir.join(kind.exe_name())
    }

    /// Verify the listed tools exist on disk.
    pub fn ensure_present(&self, kinds: &[ToolKind]) -> SignResult<()> {
        if !self.tools_dir.is_dir() {
            return Err(SignError::ConfigurationError(format!(
                "Tools directory missing: {}",
                self.tools_dir.display()
            )));
        }
        for kind in kinds {
            let path = self.resolve(*kind);
            if !path.is_file() {
                return Err(SignError::ConfigurationError(format!(
                    "{} not found: {}",
                    kind.exe_name(),
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Verify the tools an operation depends on are available.
    ///
    /// Every batch operation runs through signtool; certificate generation is
    /// validated separately via [`ToolKind::CERT_GENERATION`].
    pub fn ensure_for_operation(&self, _operation: Operation) -> SignResult<()> {
        self.ensure_present(&[ToolKind::SignTool])
    }
}
