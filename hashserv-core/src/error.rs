use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashservError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HashservError>;
