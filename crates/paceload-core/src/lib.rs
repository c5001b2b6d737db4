pub mod config;
pub mod error;
pub mod outcome;
pub mod pacer;
pub mod progress;
pub mod record;
pub mod report;
pub mod sink;
pub mod source;
pub mod writer;

// Re-exports
pub use config::WriterConfig;
pub use error::{Error, Result};
pub use outcome::{FailureKind, RecordFailure, RetryState, WriteOutcome};
pub use pacer::Pacer;
pub use progress::{NoopProgress, ProgressEvent, ProgressSink, TracingProgress};
pub use record::{Record, Row};
pub use report::LoadReport;
pub use sink::RecordSink;
pub use source::{IterSource, RecordSource};
pub use writer::ThrottledWriter;

pub use tokio_util::sync::CancellationToken;
