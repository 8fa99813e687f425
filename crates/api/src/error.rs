#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid match rule bits: {0:#x}")]
    InvalidMatchRule(u32),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
