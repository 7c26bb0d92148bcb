//! # Vector Store
//!
//! Named collections of documents, metadata and embeddings with
//! nearest-neighbor query by text.
//!
//! A collection is bound to an [`EmbeddingProvider`] when it is created or
//! opened; documents are embedded on insert and queries are embedded with the
//! same provider. Collections can live purely in memory or be persisted as one
//! JSON snapshot per collection under a root directory.
//!
//! ```rust,ignore
//! use jdrec_vector_store::{Document, VectorStore};
//!
//! let store = VectorStore::open("./jdrec_store").await?;
//! let collection = store.create_collection("job_descriptions", provider).await?;
//! collection.add(vec![Document::new("jd_0", "Backend Developer - Build APIs.")]).await?;
//! let matches = collection.query("Backend Developer", 3).await?;
//! ```

pub mod collection;
pub mod error;
pub mod store;

pub use collection::{Collection, Document, QueryMatch};
pub use error::{Result, StoreError};
pub use store::VectorStore;

pub use jdrec_embeddings::EmbeddingProvider;
