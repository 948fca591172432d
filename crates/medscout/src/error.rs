//! Error types for the store, embedding and label-source seams.
//!
//! Nothing here crosses the orchestrator boundary: the orchestrator logs
//! these and degrades to an empty result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("embedding endpoint returned no vectors")]
    Empty,

    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum LabelSourceError {
    #[error("label request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("label endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse label response: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("embedding has dimension {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("vector index error: {0}")]
    Index(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
