use crate::progress::ProgressEvent;
use crate::report::rate;
use crate::{
    Error, FailureKind, LoadReport, Pacer, ProgressSink, Record, RecordFailure, RecordSink,
    RecordSource, Result, RetryState, TracingProgress, WriteOutcome, WriterConfig,
};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Sequential, rate-limited, retrying writer.
///
/// One record is in flight at a time and records are attempted in source
/// order. Every sink call, retries included, waits for the pacer, so the
/// configured rate is a ceiling on attempts rather than on successes.
#[derive(Clone)]
pub struct ThrottledWriter {
    config: WriterConfig,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl ThrottledWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            progress: Arc::new(TracingProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Token that stops the run before the next record is pulled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Write every record from `source` into `sink`.
    ///
    /// Record failures end up in the report. Only invalid configuration, a
    /// sink that fails to open, or a source read error abort the run.
    pub async fn run<S, K>(&self, mut source: S, sink: &mut K) -> Result<LoadReport>
    where
        S: RecordSource,
        K: RecordSink<S::Item>,
    {
        self.config.validate()?;

        let report = LoadReport::new();
        let span = tracing::info_span!("load_run", run_id = %report.run_id, sink = sink.name());

        async move {
            let mut report = report;

            if let Err(e) = sink.open().await {
                return Err(Error::SinkOpen {
                    sink: sink.name().to_string(),
                    reason: e.to_string(),
                });
            }

            let total = source.size_hint();
            match total {
                Some(total) => tracing::info!(
                    "Starting sequential insert of {} records at {} records/sec ({} attempts max per record)",
                    total,
                    self.config.rate_limit_per_second,
                    self.config.max_attempts_per_record
                ),
                None => tracing::info!(
                    "Starting sequential insert at {} records/sec ({} attempts max per record)",
                    self.config.rate_limit_per_second,
                    self.config.max_attempts_per_record
                ),
            }

            let started = Instant::now();
            let outcome = self
                .drive(&mut source, sink, &mut report, total, started)
                .await;

            if let Err(e) = sink.close().await {
                tracing::warn!("Failed to close sink {}: {}", sink.name(), e);
            }

            let aborted = outcome?;
            let report = report.finish(started.elapsed(), aborted);

            if aborted {
                tracing::warn!(
                    "Load cancelled after {} records ({} succeeded, {} failed)",
                    report.attempted,
                    report.succeeded,
                    report.failed
                );
            } else {
                tracing::info!(
                    "Load completed in {:.1}s: {} succeeded, {} failed, {} retries",
                    report.elapsed.as_secs_f64(),
                    report.succeeded,
                    report.failed,
                    report.retries()
                );
            }

            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Main loop. Returns `true` if the run was cancelled.
    async fn drive<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        report: &mut LoadReport,
        total: Option<u64>,
        started: Instant,
    ) -> Result<bool>
    where
        S: RecordSource,
        K: RecordSink<S::Item>,
    {
        let mut pacer = Pacer::new(self.config.min_attempt_interval());
        let mut position: u64 = 0;

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation requested, stopping before record {}", position + 1);
                return Ok(true);
            }

            let record = match source.next_record().await? {
                Some(record) => record,
                None => return Ok(false),
            };
            position += 1;

            match self
                .write_with_retry(&record, position, sink, &mut pacer, report)
                .await
            {
                Ok(attempts) => {
                    report.record_success();
                    tracing::debug!(
                        "Record {} ({}) written after {} attempt(s)",
                        position,
                        record.natural_key(),
                        attempts
                    );

                    let interval = self.config.progress_interval_records;
                    if interval > 0 && report.succeeded % interval == 0 {
                        self.emit_progress(report, total, started);
                    }
                }
                Err(failure) => {
                    report.record_failure();
                    self.progress.on_record_failed(&failure);
                }
            }
        }
    }

    /// Attempt one record until it succeeds, fails permanently or runs out
    /// of attempts. Ok carries the attempt count.
    async fn write_with_retry<R, K>(
        &self,
        record: &R,
        position: u64,
        sink: &mut K,
        pacer: &mut Pacer,
        report: &mut LoadReport,
    ) -> std::result::Result<u32, RecordFailure>
    where
        R: Record,
        K: RecordSink<R>,
    {
        let mut retry = RetryState::new(self.config.max_attempts_per_record);
        let failed = |kind: FailureKind, attempts: u32, reason: String| RecordFailure {
            position,
            key: record.natural_key().to_string(),
            kind,
            attempts,
            reason,
        };

        loop {
            pacer.acquire().await;
            retry.record_attempt();
            report.write_calls += 1;

            match sink.write(record).await {
                WriteOutcome::Succeeded => return Ok(retry.attempts()),
                WriteOutcome::FailedPermanent(reason) => {
                    return Err(failed(FailureKind::Permanent, retry.attempts(), reason));
                }
                WriteOutcome::FailedTransient(reason) => {
                    if retry.is_exhausted() {
                        return Err(failed(
                            FailureKind::RetriesExhausted,
                            retry.attempts(),
                            reason,
                        ));
                    }

                    tracing::warn!(
                        "Transient failure writing {} (attempt {}/{}): {}",
                        record.natural_key(),
                        retry.attempts(),
                        self.config.max_attempts_per_record,
                        reason
                    );
                }
            }
        }
    }

    fn emit_progress(&self, report: &LoadReport, total: Option<u64>, started: Instant) {
        let elapsed = started.elapsed();
        let event = ProgressEvent {
            processed: report.attempted,
            succeeded: report.succeeded,
            failed: report.failed,
            total,
            elapsed,
            observed_rate: rate(report.attempted, elapsed),
        };

        self.progress.on_progress(&event);
    }
}
