use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis connect error: {0}")]
    ConnectionError(#[from] redis::RedisError),

    #[error("Cache key not exist")]
    KeyNotFound,

    #[error("Cache operation error: {0}")]
    OperationError(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
