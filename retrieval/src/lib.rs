//! # Job Description Retrieval
//!
//! Recommends job descriptions by semantic similarity to a position title and
//! keeps the vector index in step with the on-disk corpus.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      JdRecommender                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   upsert ──► CorpusFile (jds.json) ──► reindex                   │
//! │                                          │                       │
//! │                                          ▼                       │
//! │                           weighted_document  ──► Collection      │
//! │                                                      ▲           │
//! │   recommend ──► weighted_query ──────── query ───────┘           │
//! │                      │                                           │
//! │                      ▼                                           │
//! │              strip_title_prefix ──► JdRecord                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jdrec_retrieval::{JdRecommender, RecommenderConfig};
//!
//! let recommender = JdRecommender::from_config(RecommenderConfig::new("jds.json")).await?;
//! recommender.reindex().await?;
//! let jds = recommender.recommend("Backend Developer", None).await?;
//! ```

pub mod config;
pub mod corpus;
pub mod document;
pub mod engine;
pub mod error;

pub use config::{EmbeddingConfig, EmbeddingProviderType, RecommenderConfig};
pub use corpus::{CorpusFile, JdRecord, upsert_record};
pub use document::{document_id, strip_title_prefix, weighted_document, weighted_query};
pub use engine::{JdRecommender, ReindexSummary, UpsertOutcome};
pub use error::{RecommendError, Result};
