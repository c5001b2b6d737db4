pub mod classify;
pub mod error;
pub mod sink;
pub mod statement;

// Re-exports
pub use classify::classify_error;
pub use error::{Error, Result};
pub use sink::{PostgresSink, PostgresSinkConfig};
pub use statement::UpsertStatement;
