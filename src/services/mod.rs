//! Engine services: toolchain resolution, planning, credential handling,
//! output classification, certificate generation, and report aggregation.

pub mod certgen;
pub mod classifier;
pub mod credentials;
pub mod planner;
pub mod report;
pub mod toolchain;

pub use certgen::CertificateGenerator;
pub use classifier::{classify, Classification, TimestampFailurePredicate};
pub use credentials::CredentialCache;
pub use planner::{plan, ExecutionTask};
pub use report::{NullSink, OutcomeSink, ReportAggregator};
pub use toolchain::{ToolKind, Toolchain};
