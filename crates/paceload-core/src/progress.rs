use crate::RecordFailure;
use serde::Serialize;
use std::time::Duration;

/// Snapshot of a run, emitted every `progress_interval_records` successes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Records that reached a terminal outcome.
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Total records, when the source knows it.
    pub total: Option<u64>,
    pub elapsed: Duration,
    /// Processed records per second since the run started.
    pub observed_rate: f64,
}

impl ProgressEvent {
    pub fn percent_complete(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some(self.processed as f64 / total as f64 * 100.0),
            None => None,
        }
    }

    /// `(total - processed) / observed_rate`.
    pub fn eta(&self) -> Option<Duration> {
        let total = self.total?;
        if self.observed_rate <= 0.0 {
            return None;
        }

        let remaining = total.saturating_sub(self.processed) as f64;
        Some(Duration::from_secs_f64(remaining / self.observed_rate))
    }
}

/// Receives observability events from a run. Never affects control flow.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);

    fn on_record_failed(&self, _failure: &RecordFailure) {}
}

/// Reports progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match (event.total, event.percent_complete(), event.eta()) {
            (Some(total), Some(percent), eta) => {
                let eta_minutes = eta.map(|d| d.as_secs_f64() / 60.0).unwrap_or(0.0);
                tracing::info!(
                    processed = event.processed,
                    succeeded = event.succeeded,
                    failed = event.failed,
                    "Progress: {}/{} records ({:.1}%) - Rate: {:.2} records/sec - ETA: {:.1} minutes",
                    event.processed,
                    total,
                    percent,
                    event.observed_rate,
                    eta_minutes
                );
            }
            _ => {
                tracing::info!(
                    processed = event.processed,
                    succeeded = event.succeeded,
                    failed = event.failed,
                    "Progress: {} records - Rate: {:.2} records/sec",
                    event.processed,
                    event.observed_rate
                );
            }
        }
    }

    fn on_record_failed(&self, failure: &RecordFailure) {
        tracing::error!(
            position = failure.position,
            attempts = failure.attempts,
            kind = %failure.kind,
            "Error inserting record {} ({}): {}",
            failure.position,
            failure.key,
            failure.reason
        );
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
