//! Error types for the vector store.

use thiserror::Error;

/// Result type alias for vector store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the vector store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Collection does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// Collection already exists.
    #[error("collection already exists: {0}")]
    CollectionExists(String),

    /// Collection name is not usable as a snapshot file name.
    #[error("invalid collection name: {0:?}")]
    InvalidName(String),

    /// A document id is already present in the collection or repeated in a batch.
    #[error("duplicate document id: {0}")]
    DuplicateId(String),

    /// Embedding generation or comparison failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] jdrec_embeddings::EmbeddingError),

    /// Snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
