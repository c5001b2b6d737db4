use crate::{Record, Result, WriteOutcome};
use async_trait::async_trait;

/// Destination for records.
///
/// A sink must classify every failed write as transient or permanent, and
/// writes must be idempotent on the record's natural key: the writer resends
/// the identical record after a transient failure.
#[async_trait]
pub trait RecordSink<R: Record>: Send {
    /// Sink name (used for logging)
    fn name(&self) -> &str;

    /// Acquire connections or other resources before the first write.
    async fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Attempt a single write. Failures are reported, not raised.
    async fn write(&mut self, record: &R) -> WriteOutcome;

    /// Release resources after the last write.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
