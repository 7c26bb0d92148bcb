//! Error types for the recommender.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for recommender operations.
pub type Result<T> = std::result::Result<T, RecommendError>;

/// Errors that can occur while indexing, querying or editing the corpus.
#[derive(Error, Debug)]
pub enum RecommendError {
    /// The corpus file does not exist.
    #[error("corpus file not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    /// The corpus file exists but is not a JSON array of records.
    #[error("corpus file {} is malformed: {source}", path.display())]
    MalformedCorpus {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No collection exists yet; data has to be reloaded first.
    #[error("collection {0} not found, reload data first")]
    NotIndexed(String),

    /// The vector store returned no matches.
    #[error("no results found for {0:?}")]
    NoResults(String),

    /// A record failed validation.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A request parameter failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A stored document has no title metadata.
    #[error("document {0} has no title metadata")]
    MissingMetadata(String),

    /// The corpus was saved but rebuilding the index failed.
    #[error("job description saved but reindex failed: {source}")]
    StaleIndex {
        #[source]
        source: Box<RecommendError>,
    },

    /// Vector store error.
    #[error("vector store error: {0}")]
    Store(#[from] jdrec_vector_store::StoreError),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] jdrec_embeddings::EmbeddingError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
