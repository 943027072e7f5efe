use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StagehandError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Orchestration error: {0}")]
    OrchestrationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, StagehandError>;
