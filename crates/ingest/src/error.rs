use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("intake closed: {0}")]
    Closed(String),
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("commit failed: {0}")]
    Commit(String),
    #[error("storage failed: {0}")]
    Storage(String),
}
