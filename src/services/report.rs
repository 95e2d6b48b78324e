//! Report aggregation and the outcome sink seam.

use std::sync::Mutex;

use crate::domain::outcome::{Outcome, Report, StatusCounts};

/// Receives outcome events as tasks complete, plus the final summary.
///
/// Implementations must tolerate calls from concurrent task completions.
pub trait OutcomeSink: Send + Sync {
    fn on_outcome(&self, outcome: &Outcome);
    fn on_summary(&self, report: &Report);
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl OutcomeSink for NullSink {
    fn on_outcome(&self, _outcome: &Outcome) {}
    fn on_summary(&self, _report: &Report) {}
}

#[derive(Debug, Default)]
struct AggregatorInner {
    outcomes: Vec<Outcome>,
    counts: StatusCounts,
    finalized: Option<Report>,
}

/// Accumulates outcomes in completion order and keeps per-status counters.
///
/// Appends serialize through an internal mutex so concurrent completions from
/// the parallel class are safe. `finalize` is idempotent.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    inner: Mutex<AggregatorInner>,
}

impl ReportAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome. Appends after `finalize` are dropped with a
    /// warning; the finalized report is immutable.
    pub fn append(&self, outcome: Outcome) {
        let mut inner = self.inner.lock().unwrap();
        if inner.finalized.is_some() {
            log::warn!(
                "Outcome for {} arrived after the report was finalized, dropping",
                outcome.target
            );
            return;
        }
        inner.counts.record(outcome.status);
        inner.outcomes.push(outcome);
    }

    /// Current per-status counters (order-independent).
    #[must_use]
    pub fn summary(&self) -> StatusCounts {
        self.inner.lock().unwrap().counts
    }

    /// Freeze and return the final report. Repeated calls return the same
    /// report.
    #[must_use]
    pub fn finalize(&self) -> Report {
        let mut inner = self.inner.lock().unwrap();
        if let Some(report) = &inner.finalized {
            return report.clone();
        }
        let report = Report {
            outcomes: inner.outcomes.clone(),
            counts: inner.counts,
        };
        inner.finalized = Some(report.clone());
        report
    }
}
