//! Domain model for the batch signing engine.

pub mod operation;
pub mod outcome;
pub mod types;

pub use operation::{CertificateRef, CertificateRequest, ConcurrencyClass, Operation};
pub use outcome::{Outcome, Report, SignatureStatus, StatusCounts};
pub use types::{PfxPassword, TargetPath, TimestampUrl, SUPPORTED_EXTENSIONS};
