use thiserror::Error;

#[derive(Debug, Error)]
pub enum RedisError {
    #[error("Redis connect error: {0}")]
    ConnectionError(#[from] redis::RedisError),

    #[error("Redis operation error: {0}")]
    OperationError(String),
}
