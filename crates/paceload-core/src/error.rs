use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Sink '{sink}' failed to open: {reason}")]
    SinkOpen { sink: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
