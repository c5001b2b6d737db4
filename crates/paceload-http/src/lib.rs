pub mod classify;
pub mod error;
pub mod sink;

// Re-exports
pub use classify::{classify_error, classify_status};
pub use error::{Error, Result};
pub use sink::{HttpSink, HttpSinkConfig};
