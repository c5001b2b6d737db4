use async_trait::async_trait;
use paceload_core::{Record, RecordSink, Row, WriteOutcome};

/// Logs each record instead of writing it.
#[derive(Debug, Default)]
pub struct DryRunSink {
    written: u64,
}

impl DryRunSink {
    pub fn written(&self) -> u64 {
        self.written
    }
}

#[async_trait]
impl RecordSink<Row> for DryRunSink {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn write(&mut self, record: &Row) -> WriteOutcome {
        self.written += 1;
        tracing::info!("[dry-run] {} => {}", record.natural_key(), record.to_json());
        WriteOutcome::Succeeded
    }
}
