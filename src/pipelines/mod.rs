//! High-level pipelines: the batch executor and the run facade.

pub mod batch;
pub mod workflow;

pub use batch::{BatchExecutor, ExecutorConfig};
pub use workflow::BatchWorkflow;
