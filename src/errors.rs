use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShimError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to access database: {0}")]
    DatabaseError(String),

    #[error("Failed to translate invocation event: {0}")]
    EventError(String),

    #[error("Failed to initialize application: {0}")]
    InitError(String),

    #[error("Failed to reach backend: {0}")]
    ProxyError(String),
}

impl From<sqlx::Error> for ShimError {
    fn from(error: sqlx::Error) -> Self {
        ShimError::DatabaseError(error.to_string())
    }
}

impl From<reqwest::Error> for ShimError {
    fn from(error: reqwest::Error) -> Self {
        ShimError::ProxyError(error.to_string())
    }
}

impl From<anyhow::Error> for ShimError {
    fn from(error: anyhow::Error) -> Self {
        ShimError::InitError(error.to_string())
    }
}

impl From<http::Error> for ShimError {
    fn from(error: http::Error) -> Self {
        ShimError::EventError(error.to_string())
    }
}
