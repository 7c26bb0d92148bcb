//! Similarity index for embedding lookups.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::{SimilarityResult, find_top_k, normalize};

/// An entry in the similarity index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Unique identifier.
    pub id: String,

    /// The embedding vector (normalized).
    pub embedding: Embedding,

    /// Source text the embedding was computed from.
    #[serde(default)]
    pub document: Option<String>,

    /// Associated metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A flat similarity index.
///
/// Entries keep insertion order, so equal scores resolve to the entry that
/// was added first. The dimension is fixed by the first entry.
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    /// Stored entries.
    entries: IndexMap<String, IndexEntry>,

    /// Expected dimension of embeddings.
    dimension: Option<usize>,
}

impl SimilarityIndex {
    /// Create an empty index whose dimension is set by the first insert.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(EmbeddingError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    /// Add an embedding to the index, replacing any entry with the same id.
    pub fn add(
        &mut self,
        id: impl Into<String>,
        mut embedding: Embedding,
        document: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> Result<()> {
        let id = id.into();

        self.check_dimension(embedding.len())?;
        self.dimension = Some(embedding.len());

        normalize(&mut embedding);

        let entry = IndexEntry {
            id: id.clone(),
            embedding,
            document,
            metadata,
        };

        debug!("Added embedding to index: {id}");
        self.entries.insert(id, entry);

        Ok(())
    }

    /// Check if an ID exists in the index.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Get the number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Search for similar embeddings.
    ///
    /// An empty index returns no results regardless of the query dimension.
    pub fn search(&self, query: &[f32], k: usize, min_score: f32) -> Result<Vec<SimilarityResult>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        self.check_dimension(query.len())?;

        let mut query = query.to_vec();
        normalize(&mut query);

        let candidates = self
            .entries
            .values()
            .map(|e| (e.id.as_str(), e.embedding.as_slice()));

        let mut results = find_top_k(&query, candidates, k, min_score)?;

        for result in &mut results {
            if let Some(entry) = self.entries.get(&result.id) {
                result.document = entry.document.clone();
                result.metadata = entry.metadata.clone();
            }
        }

        Ok(results)
    }

    /// Build an index from previously stored entries.
    ///
    /// Embeddings are taken as stored; they were normalized on insert. Entries
    /// whose dimension disagrees with the first one are an error.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Result<Self> {
        let mut index = Self::new();
        for entry in entries {
            index.check_dimension(entry.embedding.len())?;
            index.dimension = Some(entry.embedding.len());
            index.entries.insert(entry.id.clone(), entry);
        }

        debug!("Loaded {} entries into similarity index", index.len());
        Ok(index)
    }
}
