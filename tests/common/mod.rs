//! Shared test doubles for the executor and workflow suites.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use signbatch::{
    Outcome, OutcomeSink, PasswordPrompt, PfxPassword, Report, SignResult, ToolInvoker, ToolOutput,
};

/// One recorded call into the scripted invoker.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub exe: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    /// True when the argument vector contains this exact argument.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

type Script = Box<dyn Fn(&Invocation) -> SignResult<ToolOutput> + Send + Sync>;

/// Invoker that answers from a script and records every call.
///
/// Also tracks how many invocations are in flight at once so tests can
/// assert the concurrency class actually held.
pub struct ScriptedInvoker {
    script: Script,
    log: Mutex<Vec<Invocation>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    /// Artificial per-call latency, to force overlap in parallel runs.
    pub latency: Duration,
}

impl ScriptedInvoker {
    pub fn new(
        script: impl Fn(&Invocation) -> SignResult<ToolOutput> + Send + Sync + 'static,
    ) -> Self {
        ScriptedInvoker {
            script: Box::new(script),
            log: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            latency: Duration::from_millis(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.lock().unwrap().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolInvoker for ScriptedInvoker {
    async fn run(
        &self,
        executable: &Path,
        args: &[OsString],
        _timeout: Duration,
    ) -> SignResult<ToolOutput> {
        let invocation = Invocation {
            exe: executable.to_path_buf(),
            args: args
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
        };
        self.log.lock().unwrap().push(invocation.clone());

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = (self.script)(&invocation);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Prompt double with a fixed answer and a call counter.
pub struct ScriptedPrompt {
    pub answer: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn answering(answer: &str) -> Self {
        ScriptedPrompt {
            answer: Some(answer.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn cancelling() -> Self {
        ScriptedPrompt {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PasswordPrompt for ScriptedPrompt {
    async fn request_password(&self, _cert_path: &Path) -> SignResult<Option<PfxPassword>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone().map(PfxPassword::new))
    }
}

/// Sink that records streamed outcomes and the final summary.
#[derive(Default)]
pub struct RecordingSink {
    outcomes: Mutex<Vec<Outcome>>,
    summaries: Mutex<Vec<Report>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcome_count(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.lock().unwrap().len()
    }
}

impl OutcomeSink for RecordingSink {
    fn on_outcome(&self, outcome: &Outcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }

    fn on_summary(&self, report: &Report) {
        self.summaries.lock().unwrap().push(report.clone());
    }
}

/// Successful tool output carrying the given text on stdout.
pub fn ok_output(text: &str) -> SignResult<ToolOutput> {
    Ok(ToolOutput {
        exit_code: Some(0),
        stdout: text.to_string(),
        stderr: String::new(),
    })
}

/// Failed tool output carrying the given text on stderr.
pub fn failed_output(exit: i32, text: &str) -> SignResult<ToolOutput> {
    Ok(ToolOutput {
        exit_code: Some(exit),
        stdout: String::new(),
        stderr: text.to_string(),
    })
}
