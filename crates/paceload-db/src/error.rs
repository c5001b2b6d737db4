use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Invalid sink configuration: {0}")]
    Configuration(String),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for paceload_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Configuration(msg) => paceload_core::Error::Configuration(msg),
            other => paceload_core::Error::Other(anyhow::Error::new(other)),
        }
    }
}
