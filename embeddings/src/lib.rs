//! # Embeddings
//!
//! Text-to-vector conversion and similarity search used to index and match
//! job descriptions.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors through an
//!   OpenAI-compatible HTTP endpoint or an offline hashing model
//! - **Similarity Search**: Cosine similarity over a flat, insertion-ordered index
//! - **Caching**: Reuse embeddings across full reindexes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► SimilarityIndex           │
//! │       │                                   │                     │
//! │       ▼                                   ▼                     │
//! │  OpenAI / Hash / Cached             find_top_k (cosine)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod index;
pub mod provider;
pub mod similarity;

pub use cache::{CachedProvider, EmbeddingCache};
pub use error::{EmbeddingError, Result};
pub use index::{IndexEntry, SimilarityIndex};
pub use provider::{
    DEFAULT_BATCH_SIZE, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, HashProvider,
    OpenAIProvider,
};
pub use similarity::{SimilarityResult, cosine_similarity};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of `all-mpnet-base-v2`, the sentence model the service is tuned for.
pub const DEFAULT_DIMENSION: usize = 768;

/// Default model name requested from OpenAI-compatible endpoints.
pub const DEFAULT_MODEL: &str = "all-mpnet-base-v2";
