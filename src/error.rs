//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::llm::ProviderError> for AppError {
    fn from(e: crate::llm::ProviderError) -> Self {
        AppError::Llm(e.to_string())
    }
}
