use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymdexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("API error: {0}")]
    Api(#[from] symdex_api::ApiError),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SymdexError>;
