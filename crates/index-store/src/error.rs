use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexStoreError>;

#[derive(Error, Debug)]
pub enum IndexStoreError {
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("{0}")]
    Other(String),
}
