use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_RATE_LIMIT_PER_SECOND: f64 = 1.0;
pub const DEFAULT_MAX_ATTEMPTS_PER_RECORD: u32 = 20;
pub const DEFAULT_PROGRESS_INTERVAL_RECORDS: u64 = 10;

/// Settings for a single load run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Ceiling on write attempts per second, retries included.
    pub rate_limit_per_second: f64,

    /// Attempts allowed per record, the first one included.
    pub max_attempts_per_record: u32,

    /// Emit a progress event every this many successful records. 0 disables.
    pub progress_interval_records: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_second: DEFAULT_RATE_LIMIT_PER_SECOND,
            max_attempts_per_record: DEFAULT_MAX_ATTEMPTS_PER_RECORD,
            progress_interval_records: DEFAULT_PROGRESS_INTERVAL_RECORDS,
        }
    }
}

impl WriterConfig {
    pub fn with_rate_limit(mut self, per_second: f64) -> Self {
        self.rate_limit_per_second = per_second;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts_per_record = attempts;
        self
    }

    pub fn with_progress_interval(mut self, records: u64) -> Self {
        self.progress_interval_records = records;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rate_limit_per_second.is_finite() || self.rate_limit_per_second <= 0.0 {
            return Err(Error::Configuration(format!(
                "rate_limit_per_second must be a positive number, got {}",
                self.rate_limit_per_second
            )));
        }

        if Duration::try_from_secs_f64(1.0 / self.rate_limit_per_second).is_err() {
            return Err(Error::Configuration(format!(
                "rate_limit_per_second {} is too small to pace attempts",
                self.rate_limit_per_second
            )));
        }

        if self.max_attempts_per_record < 1 {
            return Err(Error::Configuration(
                "max_attempts_per_record must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Minimum spacing between the starts of two write attempts.
    ///
    /// Saturates for rates `validate()` rejects.
    pub fn min_attempt_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.rate_limit_per_second).unwrap_or(Duration::MAX)
    }
}
