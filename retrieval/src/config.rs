//! Configuration for the recommender.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use jdrec_embeddings::{
    CachedProvider, DEFAULT_BATCH_SIZE, DEFAULT_MODEL, EmbeddingCache, EmbeddingProvider,
    HashProvider, OpenAIProvider,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Default corpus file, relative to the working directory.
pub const DEFAULT_CORPUS_PATH: &str = "jds.json";

/// Default collection holding the indexed corpus.
pub const DEFAULT_COLLECTION: &str = "job_descriptions";

/// Default self-hosted embedding endpoint.
pub const DEFAULT_EMBEDDING_URL: &str = "http://127.0.0.1:8080/v1";

/// Configuration for the recommender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// JSON array of `{title, jd}` records.
    pub corpus_path: PathBuf,

    /// Vector store snapshot directory. `None` keeps the index in memory.
    pub storage_path: Option<PathBuf>,

    /// Name of the collection holding the indexed corpus.
    pub collection: String,

    /// Number of recommendations returned when the caller does not ask for a count.
    pub top_k: usize,

    /// How many times the title is repeated in documents and queries.
    pub title_weight: usize,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,
}

impl RecommenderConfig {
    /// Create a configuration with default values for the given corpus file.
    pub fn new(corpus_path: impl Into<PathBuf>) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            storage_path: Some(PathBuf::from("jdrec_store")),
            collection: DEFAULT_COLLECTION.to_string(),
            top_k: 3,
            title_weight: 3,
            embedding: EmbeddingConfig::default(),
        }
    }

    /// Persist the vector store under `path`.
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Keep the vector store in memory only.
    pub fn in_memory(mut self) -> Self {
        self.storage_path = None;
        self
    }

    /// Set the collection name.
    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.collection = name.into();
        self
    }

    /// Set the default number of recommendations.
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CORPUS_PATH)
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to request. Defaults to the provider's model.
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint.
    pub base_url: Option<String>,

    /// API key. Falls back to `OPENAI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Output dimension override.
    pub dimensions: Option<usize>,

    /// Maximum texts sent to the endpoint in one request.
    pub batch_size: usize,

    /// Whether to cache embeddings between reindexes.
    pub cache_enabled: bool,

    /// Maximum cache size.
    pub cache_max_entries: usize,
}

impl EmbeddingConfig {
    /// Offline hashing embeddings, no cache.
    pub fn hash() -> Self {
        Self {
            provider: EmbeddingProviderType::Hash,
            cache_enabled: false,
            ..Self::default()
        }
    }

    /// Build the configured provider.
    ///
    /// With caching enabled and a `cache_dir`, the cache is persisted to
    /// `cache_dir/cache/embedding_cache.json`, outside the collection
    /// snapshots that share `cache_dir`.
    pub async fn build_provider(
        &self,
        cache_dir: Option<&Path>,
    ) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.provider {
            EmbeddingProviderType::Hash => {
                let mut provider = HashProvider::new();
                if let Some(dims) = self.dimensions {
                    provider = provider.with_dimension(dims);
                }
                self.wrap(provider, cache_dir).await
            }
            EmbeddingProviderType::OpenAI => {
                let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_EMBEDDING_URL);
                let mut provider = OpenAIProvider::new(base_url)
                    .with_model(self.model.as_deref().unwrap_or(DEFAULT_MODEL))
                    .with_batch_size(self.batch_size);
                if let Some(key) = self
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                {
                    provider = provider.with_api_key(key);
                }
                if let Some(dims) = self.dimensions {
                    provider = provider.with_dimensions(dims);
                }
                self.wrap(provider, cache_dir).await
            }
        }
    }

    async fn wrap<P>(&self, provider: P, cache_dir: Option<&Path>) -> Result<Arc<dyn EmbeddingProvider>>
    where
        P: EmbeddingProvider + 'static,
    {
        info!(
            "Using {} embeddings (model: {})",
            provider.name(),
            provider.default_model()
        );

        if !self.cache_enabled {
            return Ok(Arc::new(provider));
        }

        let cache = match cache_dir {
            Some(dir) => {
                EmbeddingCache::with_persistence(
                    dir.join("cache").join("embedding_cache.json"),
                    self.cache_max_entries,
                )
                .await?
            }
            None => EmbeddingCache::new(self.cache_max_entries),
        };

        Ok(Arc::new(CachedProvider::new(provider, cache)))
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::OpenAI,
            model: None,
            base_url: None,
            api_key: None,
            dimensions: None,
            batch_size: DEFAULT_BATCH_SIZE,
            cache_enabled: true,
            cache_max_entries: 10000,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible embeddings API.
    #[serde(rename = "openai")]
    OpenAI,
    /// Offline feature-hashing embeddings.
    Hash,
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "hash" => Ok(Self::Hash),
            other => Err(format!("unknown embedding provider: {other}")),
        }
    }
}
