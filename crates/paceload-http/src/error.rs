use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for paceload_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidEndpoint(msg) => paceload_core::Error::Configuration(msg),
            other => paceload_core::Error::Other(anyhow::Error::new(other)),
        }
    }
}
