//! A named collection of embedded documents.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use jdrec_embeddings::{EmbeddingProvider, EmbeddingRequest, IndexEntry, SimilarityIndex};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// A document to insert into a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique id within the collection.
    pub id: String,

    /// Text that is embedded and returned on match.
    pub text: String,

    /// Arbitrary metadata returned with matches.
    pub metadata: Option<serde_json::Value>,
}

impl Document {
    /// Create a document without metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: None,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub document: String,
    pub metadata: Option<serde_json::Value>,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// On-disk form of a collection.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CollectionSnapshot {
    pub name: String,
    pub entries: Vec<IndexEntry>,
}

/// Handle to a collection bound to an embedding provider.
///
/// Handles are cheap to clone and share the underlying data. A handle kept
/// past [`VectorStore::delete_collection`](crate::VectorStore::delete_collection)
/// still sees the data it had but is no longer reachable through the store.
#[derive(Clone)]
pub struct Collection {
    name: String,
    data: Arc<RwLock<SimilarityIndex>>,
    provider: Arc<dyn EmbeddingProvider>,
    snapshot_path: Option<PathBuf>,
}

impl Collection {
    pub(crate) fn new(
        name: String,
        data: Arc<RwLock<SimilarityIndex>>,
        provider: Arc<dyn EmbeddingProvider>,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        Self {
            name,
            data,
            provider,
            snapshot_path,
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored documents.
    pub async fn count(&self) -> usize {
        self.data.read().await.len()
    }

    /// Embed and insert documents.
    ///
    /// All documents are embedded in one provider batch before the collection
    /// is locked, then inserted under a single write lock. If any id is
    /// already present (or repeated in the batch) nothing is inserted.
    pub async fn add(&self, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        self.check_new_ids(&documents, &*self.data.read().await)?;

        let requests = documents
            .iter()
            .map(|doc| EmbeddingRequest::new(doc.text.clone()))
            .collect();
        let embeddings = self.provider.embed_batch(requests).await?;

        let count = documents.len();
        let snapshot = {
            let mut data = self.data.write().await;
            self.check_new_ids(&documents, &data)?;

            for (doc, response) in documents.into_iter().zip(embeddings) {
                data.add(doc.id, response.embedding, Some(doc.text), doc.metadata)?;
            }

            self.encode_snapshot(&data)?
        };

        if let Some(snapshot) = snapshot {
            self.write_snapshot(snapshot).await?;
        }

        info!("Added {count} documents to collection {}", self.name);
        Ok(count)
    }

    /// Return up to `k` documents nearest to `text`, best first.
    ///
    /// No score threshold is applied.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<QueryMatch>> {
        let response = self.provider.embed(EmbeddingRequest::new(text)).await?;

        let data = self.data.read().await;
        let results = data.search(&response.embedding, k, f32::NEG_INFINITY)?;

        debug!(
            "Query against {} returned {} of {} documents",
            self.name,
            results.len(),
            data.len()
        );

        Ok(results
            .into_iter()
            .map(|result| QueryMatch {
                id: result.id,
                document: result.document.unwrap_or_default(),
                metadata: result.metadata,
                score: result.score,
            })
            .collect())
    }

    fn check_new_ids(&self, documents: &[Document], data: &SimilarityIndex) -> Result<()> {
        let mut seen = HashSet::with_capacity(documents.len());
        for doc in documents {
            if data.contains(&doc.id) || !seen.insert(doc.id.as_str()) {
                return Err(StoreError::DuplicateId(doc.id.clone()));
            }
        }
        Ok(())
    }

    fn encode_snapshot(&self, data: &SimilarityIndex) -> Result<Option<String>> {
        if self.snapshot_path.is_none() {
            return Ok(None);
        }

        let snapshot = CollectionSnapshot {
            name: self.name.clone(),
            entries: data.entries().cloned().collect(),
        };
        Ok(Some(serde_json::to_string(&snapshot)?))
    }

    async fn write_snapshot(&self, content: String) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, path).await?;

        debug!("Saved collection snapshot: {}", path.display());
        Ok(())
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("provider", &self.provider.name())
            .field("snapshot_path", &self.snapshot_path)
            .finish()
    }
}
