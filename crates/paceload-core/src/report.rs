use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a load run.
///
/// Filled in by the writer's loop and handed back once the run ends; the
/// caller only ever sees a finished report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub run_id: String,
    /// Records consumed from the source that reached a terminal outcome.
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Sink calls, retries included.
    pub write_calls: u64,
    /// True when the run stopped on cancellation before the source was spent.
    pub aborted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed: Duration,
    /// Successful records per second over the whole run.
    pub rate_per_second: f64,
}

impl LoadReport {
    pub(crate) fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            attempted: 0,
            succeeded: 0,
            failed: 0,
            write_calls: 0,
            aborted: false,
            started_at: Utc::now(),
            finished_at: None,
            elapsed: Duration::ZERO,
            rate_per_second: 0.0,
        }
    }

    pub(crate) fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    pub(crate) fn finish(mut self, elapsed: Duration, aborted: bool) -> Self {
        self.elapsed = elapsed;
        self.aborted = aborted;
        self.finished_at = Some(Utc::now());
        self.rate_per_second = rate(self.succeeded, elapsed);
        self
    }

    pub fn is_complete(&self) -> bool {
        !self.aborted
    }

    /// Sink calls beyond the first per record.
    pub fn retries(&self) -> u64 {
        self.write_calls.saturating_sub(self.attempted)
    }
}

pub(crate) fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

impl std::fmt::Display for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.aborted { "cancelled" } else { "completed" };
        writeln!(
            f,
            "Insert {} in {:.1} seconds:",
            state,
            self.elapsed.as_secs_f64()
        )?;
        writeln!(f, "  - Processed: {}", self.attempted)?;
        writeln!(f, "  - Successful: {}", self.succeeded)?;
        writeln!(f, "  - Failed: {}", self.failed)?;
        writeln!(f, "  - Retries: {}", self.retries())?;
        write!(
            f,
            "  - Average rate: {:.2} records/second",
            self.rate_per_second
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut report = LoadReport::new();
        report.record_success();
        report.record_success();
        report.record_failure();
        report.write_calls = 5;

        let report = report.finish(Duration::from_secs(4), false);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded + report.failed, report.attempted);
        assert_eq!(report.retries(), 2);
        assert_eq!(report.rate_per_second, 0.5);
        assert!(report.is_complete());
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_zero_elapsed_rate() {
        let report = LoadReport::new().finish(Duration::ZERO, true);
        assert_eq!(report.rate_per_second, 0.0);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_display_summary() {
        let mut report = LoadReport::new();
        report.record_success();
        report.write_calls = 1;
        let text = report.finish(Duration::from_secs(2), false).to_string();

        assert!(text.contains("Insert completed in 2.0 seconds"));
        assert!(text.contains("Successful: 1"));
        assert!(text.contains("0.50 records/second"));
    }
}
