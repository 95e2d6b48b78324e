//! Batch executor: runs a plan under its operation's concurrency class.
//!
//! Parallel-class operations (verify, sign without timestamp) fan out over a
//! semaphore-bounded worker pool. Sequential-class operations (anything that
//! touches a timestamp authority) run strictly one at a time, fallback
//! included, so rate-limited TSAs never see a burst.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::adapters::invoker::{ToolInvoker, ToolOutput};
use crate::domain::operation::{ConcurrencyClass, Operation};
use crate::domain::outcome::{Outcome, Report, SignatureStatus};
use crate::domain::types::{PfxPassword, TargetPath};
use crate::infra::error::SignError;
use crate::services::classifier::{
    self, default_timestamp_failure_predicate, TimestampFailurePredicate,
};
use crate::services::credentials::CredentialCache;
use crate::services::planner::ExecutionTask;
use crate::services::report::{OutcomeSink, ReportAggregator};

/// Raw output retained on each outcome, capped so reports stay readable.
const EXCERPT_LIMIT: usize = 600;

/// Tuning for one batch run.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Worker pool size for the parallel class. Bounded to keep process
    /// handles in check; clamped to at least 1.
    pub workers: usize,
    /// Per-invocation timeout.
    pub task_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            workers: 4,
            task_timeout: Duration::from_secs(120),
        }
    }
}

struct TaskRunner {
    invoker: Arc<dyn ToolInvoker>,
    credentials: Arc<CredentialCache>,
    signtool: PathBuf,
    timeout: Duration,
    timestamp_failed: TimestampFailurePredicate,
}

/// Executes a planned batch and streams outcomes to a sink.
pub struct BatchExecutor {
    runner: Arc<TaskRunner>,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl BatchExecutor {
    #[must_use]
    pub fn new(
        invoker: Arc<dyn ToolInvoker>,
        credentials: Arc<CredentialCache>,
        signtool: PathBuf,
        config: ExecutorConfig,
    ) -> Self {
        BatchExecutor {
            runner: Arc::new(TaskRunner {
                invoker,
                credentials,
                signtool,
                timeout: config.task_timeout,
                timestamp_failed: default_timestamp_failure_predicate(),
            }),
            workers: config.workers.max(1),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the tool-specific predicate that tells a timestamp failure
    /// apart from a signing failure.
    #[must_use]
    pub fn with_timestamp_predicate(mut self, predicate: TimestampFailurePredicate) -> Self {
        let runner = Arc::get_mut(&mut self.runner)
            .expect("predicate must be set before the executor is shared");
        runner.timestamp_failed = predicate;
        self
    }

    /// Handle for requesting cooperative cancellation. Cancellation stops
    /// dispatch of not-yet-started tasks; in-flight tasks finish or hit
    /// their own timeout.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Run every task in the plan, honoring the operation's concurrency
    /// class, and return the finalized report. Every task yields exactly one
    /// outcome, cancelled ones included.
    pub async fn execute(&self, plan: Vec<ExecutionTask>, sink: Arc<dyn OutcomeSink>) -> Report {
        let aggregator = ReportAggregator::new();

        let class = plan
            .first()
            .map(|t| t.operation.concurrency_class())
            .unwrap_or(ConcurrencyClass::Sequential);

        match class {
            ConcurrencyClass::Sequential => {
                self.execute_sequential(plan, &aggregator, sink.as_ref()).await;
            }
            ConcurrencyClass::Parallel => {
                self.execute_parallel(plan, &aggregator, sink.clone()).await;
            }
        }

        let report = aggregator.finalize();
        sink.on_summary(&report);
        report
    }

    async fn execute_sequential(
        &self,
        plan: Vec<ExecutionTask>,
        aggregator: &ReportAggregator,
        sink: &dyn OutcomeSink,
    ) {
        for task in plan {
            let outcome = if self.cancel.load(Ordering::SeqCst) {
                Outcome::skipped(task.target.clone(), "run cancelled")
            } else {
                self.runner.run_task(&task).await
            };
            sink.on_outcome(&outcome);
            aggregator.append(outcome);
        }
    }

    async fn execute_parallel(
        &self,
        plan: Vec<ExecutionTask>,
        aggregator: &ReportAggregator,
        sink: Arc<dyn OutcomeSink>,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut join_set: JoinSet<Outcome> = JoinSet::new();
        // Target per in-flight task id, so a crashed worker still yields an
        // outcome for its target.
        let mut in_flight: HashMap<tokio::task::Id, TargetPath> = HashMap::new();

        for task in plan {
            if self.cancel.load(Ordering::SeqCst) {
                let outcome = Outcome::skipped(task.target.clone(), "run cancelled");
                sink.on_outcome(&outcome);
                aggregator.append(outcome);
                continue;
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break, // semaphore closed, cannot happen in practice
            };

            // Cancellation may have arrived while this task was waiting for
            // a worker slot.
            if self.cancel.load(Ordering::SeqCst) {
                drop(permit);
                let outcome = Outcome::skipped(task.target.clone(), "run cancelled");
                sink.on_outcome(&outcome);
                aggregator.append(outcome);
                continue;
            }

            let runner = self.runner.clone();
            let target = task.target.clone();
            let handle = join_set.spawn(async move {
                let outcome = runner.run_task(&task).await;
                drop(permit);
                outcome
            });
            in_flight.insert(handle.id(), target);

            // Deliver whatever has finished so far; the sink sees outcomes
            // while later tasks are still being dispatched.
            while let Some(joined) = join_set.try_join_next_with_id() {
                record_joined(joined, &mut in_flight, aggregator, sink.as_ref());
            }
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            record_joined(joined, &mut in_flight, aggregator, sink.as_ref());
        }
    }
}

/// Record one joined worker result. A panicked or aborted worker is turned
/// into a `ToolError` outcome for its target, keeping one outcome per task.
fn record_joined(
    joined: Result<(tokio::task::Id, Outcome), JoinError>,
    in_flight: &mut HashMap<tokio::task::Id, TargetPath>,
    aggregator: &ReportAggregator,
    sink: &dyn OutcomeSink,
) {
    let outcome = match joined {
        Ok((id, outcome)) => {
            in_flight.remove(&id);
            outcome
        }
        Err(e) => {
            log::error!("Signing worker crashed: {e}");
            match in_flight.remove(&e.id()) {
                Some(target) => {
                    Outcome::tool_error(target, format!("Signing worker crashed: {e}"), 0)
                }
                None => return,
            }
        }
    };
    sink.on_outcome(&outcome);
    aggregator.append(outcome);
}

impl TaskRunner {
    /// Run one task to a final outcome: credential resolution, primary
    /// attempt, optional password retry, optional legacy-timestamp fallback.
    async fn run_task(&self, task: &ExecutionTask) -> Outcome {
        let mut password = match self.resolve_credential(task).await {
            Ok(password) => password,
            Err(outcome) => return *outcome,
        };

        log::info!("[{}] {} {}", task.index + 1, task.operation.as_str(), task.target);

        let mut attempts: u32 = 1;
        let mut output =
            match self.invoke(&task.primary_args(password.as_ref())).await {
                Ok(output) => output,
                Err(e) => return invoker_error_outcome(task, e, attempts),
            };

        // A rejected password gets one reprompt and one retry of the same
        // argument vector before anything else is considered.
        if !output.success()
            && task.credential_for.is_some()
            && classifier::indicates_password_problem(&output.combined())
        {
            let cert_path = task.credential_for.as_deref().unwrap();
            match self.credentials.reprompt(cert_path).await {
                Ok(Some(new_password)) => {
                    password = Some(new_password);
                    attempts += 1;
                    output = match self.invoke(&task.primary_args(password.as_ref())).await {
                        Ok(output) => output,
                        Err(e) => return invoker_error_outcome(task, e, attempts),
                    };
                }
                Ok(None) => {
                    return Outcome::skipped(task.target.clone(), "password prompt cancelled");
                }
                Err(e) => return invoker_error_outcome(task, e, attempts),
            }
        }

        // RFC 3161 failed on the timestamp step: retry once with the legacy
        // /t form before recording a final outcome.
        if !output.success() && task.has_fallback() && (self.timestamp_failed)(&output) {
            log::warn!(
                "[{}] RFC 3161 timestamp failed for {}, retrying with legacy /t",
                task.index + 1,
                task.target
            );
            if let Some(fallback) = task.fallback_args(password.as_ref()) {
                attempts += 1;
                output = match self.invoke(&fallback).await {
                    Ok(output) => output,
                    Err(e) => return invoker_error_outcome(task, e, attempts),
                };
            }
        }

        finish_outcome(task, &output, attempts)
    }

    async fn resolve_credential(
        &self,
        task: &ExecutionTask,
    ) -> Result<Option<PfxPassword>, Box<Outcome>> {
        let Some(cert_path) = task.credential_for.as_deref() else {
            return Ok(None);
        };
        match self.credentials.get_or_prompt(cert_path).await {
            Ok(Some(password)) => Ok(Some(password)),
            Ok(None) => Err(Box::new(Outcome::skipped(
                task.target.clone(),
                "password prompt cancelled",
            ))),
            Err(e) => Err(Box::new(Outcome::tool_error(
                task.target.clone(),
                e.to_string(),
                0,
            ))),
        }
    }

    async fn invoke(
        &self,
        args: &[std::ffi::OsString],
    ) -> Result<ToolOutput, SignError> {
        self.invoker.run(&self.signtool, args, self.timeout).await
    }
}

fn invoker_error_outcome(task: &ExecutionTask, error: SignError, attempts: u32) -> Outcome {
    log::error!("[{}] {}: {error}", task.index + 1, task.target);
    Outcome::tool_error(task.target.clone(), error.to_string(), attempts)
}

fn finish_outcome(task: &ExecutionTask, output: &ToolOutput, attempts: u32) -> Outcome {
    let excerpt: String = output.combined().chars().take(EXCERPT_LIMIT).collect();

    // The classifier's patterns describe verification output; a failed sign
    // or timestamp run is a tool failure, not a trust verdict.
    if task.operation != Operation::Verify && !output.success() {
        return Outcome {
            target: task.target.clone(),
            status: SignatureStatus::ToolError,
            exit_code: output.exit_code,
            signer: None,
            issuer: None,
            timestamp: None,
            raw_excerpt: excerpt,
            reason: Some(format!(
                "{} failed after {attempts} attempt(s)",
                task.operation.as_str()
            )),
            attempts,
        };
    }

    let classification = classifier::classify(task.operation, output);
    Outcome {
        target: task.target.clone(),
        status: classification.status,
        exit_code: output.exit_code,
        signer: classification.signer,
        issuer: classification.issuer,
        timestamp: classification.timestamp,
        raw_excerpt: excerpt,
        reason: classification.reason,
        attempts,
    }
}
