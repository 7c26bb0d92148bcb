//! Indexing, retrieval and corpus editing.

use std::path::Path;
use std::sync::Arc;

use jdrec_embeddings::EmbeddingProvider;
use jdrec_vector_store::{Collection, Document, StoreError, VectorStore};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::RecommenderConfig;
use crate::corpus::{CorpusFile, JdRecord, upsert_record};
use crate::document::{document_id, strip_title_prefix, weighted_document, weighted_query};
use crate::error::{RecommendError, Result};

/// Result of a full reindex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexSummary {
    /// Number of records indexed.
    pub count: usize,
}

impl ReindexSummary {
    /// Human-readable summary, as reported by the reload endpoint.
    pub fn message(&self) -> String {
        format!("{} job descriptions loaded.", self.count)
    }
}

/// Result of saving a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    /// Normalized title that was saved.
    pub title: String,

    /// Whether an existing record with the same title was replaced.
    pub replaced: bool,

    /// Number of records in the corpus after the save.
    pub records: usize,

    /// Number of records indexed by the follow-up reindex.
    pub indexed: usize,
}

/// Job description recommender.
///
/// Owns the corpus file handle and the collection derived from it. Every
/// reindex rebuilds the collection from scratch: the old collection is
/// deleted, an empty one is created, and then all records are embedded and
/// inserted in one batch. Queries running during a reindex can observe the
/// collection missing or empty.
pub struct JdRecommender {
    config: RecommenderConfig,
    corpus: CorpusFile,
    store: Arc<VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,

    /// Serializes rebuilds so two reloads cannot interleave delete/create.
    reindex_lock: Mutex<()>,

    /// Serializes corpus edits within this process.
    edit_lock: Mutex<()>,
}

impl JdRecommender {
    /// Create a recommender over an existing store and provider.
    pub fn new(
        config: RecommenderConfig,
        store: Arc<VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            corpus: CorpusFile::new(&config.corpus_path),
            config,
            store,
            provider,
            reindex_lock: Mutex::new(()),
            edit_lock: Mutex::new(()),
        }
    }

    /// Open the configured store and build the configured provider.
    pub async fn from_config(config: RecommenderConfig) -> Result<Self> {
        let store = match &config.storage_path {
            Some(path) => VectorStore::open(path).await?,
            None => VectorStore::in_memory(),
        };
        let provider = config
            .embedding
            .build_provider(config.storage_path.as_deref())
            .await?;

        Ok(Self::new(config, Arc::new(store), provider))
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn collection_name(&self) -> &str {
        &self.config.collection
    }

    pub fn corpus_path(&self) -> &Path {
        self.corpus.path()
    }

    pub fn default_k(&self) -> usize {
        self.config.top_k
    }

    async fn collection(&self) -> Result<Collection> {
        match self
            .store
            .get_collection(&self.config.collection, Arc::clone(&self.provider))
            .await
        {
            Ok(collection) => Ok(collection),
            Err(StoreError::CollectionNotFound(name)) => Err(RecommendError::NotIndexed(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of indexed documents, or `None` if nothing has been indexed.
    pub async fn indexed_count(&self) -> Option<usize> {
        match self.collection().await {
            Ok(collection) => Some(collection.count().await),
            Err(_) => None,
        }
    }

    /// Rebuild the collection from the corpus file.
    ///
    /// The previous collection is deleted before the corpus is read, so a
    /// missing or malformed corpus leaves an empty collection behind.
    pub async fn reindex(&self) -> Result<ReindexSummary> {
        let _guard = self.reindex_lock.lock().await;
        let name = &self.config.collection;

        if self.store.has_collection(name).await {
            warn!("Deleting existing collection {name}");
            match self.store.delete_collection(name).await {
                Ok(()) | Err(StoreError::CollectionNotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let collection = self
            .store
            .create_collection(name, Arc::clone(&self.provider))
            .await?;

        let records = self.corpus.load().await?;
        info!(
            "Found {} job descriptions in {}",
            records.len(),
            self.corpus.path().display()
        );

        let documents = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                Document::new(
                    document_id(index),
                    weighted_document(&record.title, &record.jd, self.config.title_weight),
                )
                .with_metadata(serde_json::json!({ "title": record.title }))
            })
            .collect();

        let count = collection.add(documents).await?;
        info!("All job descriptions reloaded into collection {name}");

        Ok(ReindexSummary { count })
    }

    /// Recommend up to `k` job descriptions for a position title.
    ///
    /// `k` defaults to the configured top-k. An empty match list is an error.
    pub async fn recommend(&self, position_name: &str, k: Option<usize>) -> Result<Vec<JdRecord>> {
        let position = position_name.trim();
        let k = k.unwrap_or(self.config.top_k);
        if k == 0 {
            return Err(RecommendError::InvalidRequest(
                "k must be at least 1".to_string(),
            ));
        }

        let collection = self.collection().await?;

        let query = weighted_query(position, self.config.title_weight);
        let matches = collection.query(&query, k).await?;
        debug!("Query {position:?} matched {} documents", matches.len());

        if matches.is_empty() {
            return Err(RecommendError::NoResults(position.to_string()));
        }

        matches
            .into_iter()
            .map(|hit| {
                let title = hit
                    .metadata
                    .as_ref()
                    .and_then(|meta| meta.get("title"))
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| RecommendError::MissingMetadata(hit.id.clone()))?;

                Ok(JdRecord::new(title, strip_title_prefix(&hit.document)))
            })
            .collect()
    }

    /// Save a record to the corpus and rebuild the index.
    ///
    /// The title is trimmed and replaces any record with the same title
    /// (ignoring case). A malformed corpus blocks the save unless `force` is
    /// set. The reindex runs after the file is written; if it fails the
    /// record stays saved and [`RecommendError::StaleIndex`] is returned.
    pub async fn upsert(&self, title: &str, jd: &str, force: bool) -> Result<UpsertOutcome> {
        let title = title.trim();
        if title.is_empty() {
            return Err(RecommendError::InvalidRecord(
                "title must not be empty".to_string(),
            ));
        }

        let _guard = self.edit_lock.lock().await;

        let mut records = self.corpus.load_for_edit(force).await?;
        let replaced = upsert_record(&mut records, JdRecord::new(title, jd));
        self.corpus.save(&records).await?;

        info!(
            "JD for {title:?} has been {} in {}",
            if replaced { "updated" } else { "saved" },
            self.corpus.path().display()
        );

        let summary = self
            .reindex()
            .await
            .map_err(|source| RecommendError::StaleIndex {
                source: Box::new(source),
            })?;

        Ok(UpsertOutcome {
            title: title.to_string(),
            replaced,
            records: records.len(),
            indexed: summary.count,
        })
    }
}
