//! Embedding cache for reindexing without re-embedding unchanged text.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};

/// Cache entry for an embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hash of the text, model and dimension.
    pub text_hash: String,

    /// The embedding vector.
    pub embedding: Embedding,

    /// Model used to generate the embedding.
    pub model: String,

    /// Output dimension the embedding was requested at.
    #[serde(default)]
    pub dimension: usize,

    /// When the entry was created (unix seconds).
    pub created_at: u64,
}

/// Cache for embeddings to avoid redundant provider calls.
///
/// Entries are keyed by text, model and output dimension, so changing the
/// configured dimension never serves vectors of the old size. Entries are
/// evicted oldest-inserted first once `max_entries` is reached.
pub struct EmbeddingCache {
    /// In-memory cache, in insertion order.
    cache: Arc<RwLock<IndexMap<String, CacheEntry>>>,

    /// Path for persistent cache storage.
    cache_path: Option<PathBuf>,

    /// Maximum cache size.
    max_entries: usize,
}

impl EmbeddingCache {
    /// Create a new in-memory cache.
    pub fn new(max_entries: usize) -> Self {
        Self {
            cache: Arc::new(RwLock::new(IndexMap::new())),
            cache_path: None,
            max_entries,
        }
    }

    /// Create a cache backed by a JSON file, loading it if present.
    ///
    /// A file that cannot be read is logged and the cache starts empty; the
    /// next save replaces it.
    pub async fn with_persistence(path: impl AsRef<Path>, max_entries: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let cache = Self {
            cache: Arc::new(RwLock::new(IndexMap::new())),
            cache_path: Some(path.clone()),
            max_entries,
        };

        if path.exists() {
            if let Err(e) = cache.load().await {
                warn!("Ignoring unreadable embedding cache {}: {e}", path.display());
            }
        }

        Ok(cache)
    }

    /// Compute a hash for cache lookup.
    fn hash_key(text: &str, model: &str, dimension: usize) -> String {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        model.hash(&mut hasher);
        dimension.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }

    /// Get an embedding from the cache.
    pub async fn get(&self, text: &str, model: &str, dimension: usize) -> Option<Embedding> {
        let key = Self::hash_key(text, model, dimension);
        let cache = self.cache.read().await;
        cache.get(&key).map(|e| e.embedding.clone())
    }

    /// Put an embedding in the cache.
    ///
    /// Persistent caches are written by [`EmbeddingCache::save`].
    pub async fn put(&self, text: &str, model: &str, dimension: usize, embedding: Embedding) {
        let key = Self::hash_key(text, model, dimension);
        let entry = CacheEntry {
            text_hash: key.clone(),
            embedding,
            model: model.to_string(),
            dimension,
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        };

        let mut cache = self.cache.write().await;

        cache.shift_remove(&key);
        while cache.len() >= self.max_entries.max(1) {
            cache.shift_remove_index(0);
        }

        cache.insert(key, entry);
        debug!("Cached embedding for text (model: {model})");
    }

    /// Save cache to disk. No-op for in-memory caches.
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };

        let content = {
            let cache = self.cache.read().await;
            let entries: Vec<&CacheEntry> = cache.values().collect();
            serde_json::to_string(&entries)?
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, path).await?;

        debug!("Saved embedding cache to {}", path.display());
        Ok(())
    }

    /// Load cache from disk.
    async fn load(&self) -> Result<()> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };

        let content = fs::read_to_string(path).await?;
        let entries: Vec<CacheEntry> = serde_json::from_str(&content)
            .map_err(|e| EmbeddingError::Cache(format!("{}: {e}", path.display())))?;

        let mut cache = self.cache.write().await;
        for entry in entries {
            cache.insert(entry.text_hash.clone(), entry);
        }

        info!("Loaded {} cache entries from disk", cache.len());
        Ok(())
    }
}

/// A provider wrapper that serves repeated texts from an [`EmbeddingCache`].
pub struct CachedProvider<P> {
    provider: P,
    cache: EmbeddingCache,
}

impl<P> CachedProvider<P>
where
    P: EmbeddingProvider,
{
    /// Create a new cached provider.
    pub fn new(provider: P, cache: EmbeddingCache) -> Self {
        Self { provider, cache }
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Model and output dimension a request resolves to.
    fn cache_key_for(&self, request: &EmbeddingRequest) -> (String, usize) {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());
        let dimension = request
            .dimensions
            .unwrap_or_else(|| self.provider.default_dimension());
        (model, dimension)
    }
}

#[async_trait]
impl<P> EmbeddingProvider for CachedProvider<P>
where
    P: EmbeddingProvider,
{
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn default_model(&self) -> &str {
        self.provider.default_model()
    }

    fn default_dimension(&self) -> usize {
        self.provider.default_dimension()
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let (model, dimension) = self.cache_key_for(&request);

        if let Some(embedding) = self.cache.get(&request.text, &model, dimension).await {
            debug!("Cache hit for embedding");
            return Ok(EmbeddingResponse {
                dimension: embedding.len(),
                embedding,
                model,
                tokens_used: None,
            });
        }

        let text = request.text.clone();
        let response = self.provider.embed(request).await?;
        self.cache
            .put(&text, &model, dimension, response.embedding.clone())
            .await;

        Ok(response)
    }

    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        let mut slots: Vec<Option<EmbeddingResponse>> = Vec::with_capacity(requests.len());
        let mut misses: Vec<(usize, (String, usize), EmbeddingRequest)> = Vec::new();

        for (position, request) in requests.into_iter().enumerate() {
            let (model, dimension) = self.cache_key_for(&request);
            match self.cache.get(&request.text, &model, dimension).await {
                Some(embedding) => slots.push(Some(EmbeddingResponse {
                    dimension: embedding.len(),
                    embedding,
                    model,
                    tokens_used: None,
                })),
                None => {
                    slots.push(None);
                    misses.push((position, (model, dimension), request));
                }
            }
        }

        debug!(
            "Embedding cache: {} hits, {} misses",
            slots.len() - misses.len(),
            misses.len()
        );

        if !misses.is_empty() {
            let texts: Vec<(usize, (String, usize), String)> = misses
                .iter()
                .map(|(position, key, request)| (*position, key.clone(), request.text.clone()))
                .collect();
            let responses = self
                .provider
                .embed_batch(misses.into_iter().map(|(_, _, request)| request).collect())
                .await?;

            if responses.len() != texts.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    responses.len()
                )));
            }

            for ((position, (model, dimension), text), response) in texts.into_iter().zip(responses) {
                self.cache
                    .put(&text, &model, dimension, response.embedding.clone())
                    .await;
                slots[position] = Some(response);
            }

            self.cache.save().await?;
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| EmbeddingError::Cache("missing batch embedding".to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::HashProvider;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counts how many texts reach the wrapped provider.
    struct CountingProvider {
        inner: HashProvider,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn default_model(&self) -> &str {
            self.inner.default_model()
        }

        fn default_dimension(&self) -> usize {
            self.inner.default_dimension()
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(request).await
        }
    }

    #[tokio::test]
    async fn test_cache_put_get() {
        let cache = EmbeddingCache::new(100);
        let embedding = vec![1.0, 2.0, 3.0];

        cache.put("hello", "model-1", 3, embedding.clone()).await;

        assert_eq!(cache.get("hello", "model-1", 3).await, Some(embedding));
        assert!(cache.get("hello", "model-2", 3).await.is_none());
        assert!(cache.get("hello", "model-1", 2).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_eviction() {
        let cache = EmbeddingCache::new(2);

        cache.put("a", "model", 1, vec![1.0]).await;
        cache.put("b", "model", 1, vec![2.0]).await;
        cache.put("c", "model", 1, vec![3.0]).await;

        assert!(cache.get("a", "model", 1).await.is_none());
        assert_eq!(cache.get("b", "model", 1).await, Some(vec![2.0]));
        assert_eq!(cache.get("c", "model", 1).await, Some(vec![3.0]));
    }

    #[tokio::test]
    async fn test_cache_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache").join("embeddings.json");

        {
            let cache = EmbeddingCache::with_persistence(&path, 10).await.unwrap();
            cache.put("hello", "m", 1, vec![0.5]).await;
            cache.save().await.unwrap();
        }

        let cache = EmbeddingCache::with_persistence(&path, 10).await.unwrap();
        assert_eq!(cache.get("hello", "m", 1).await, Some(vec![0.5]));
    }

    #[tokio::test]
    async fn test_corrupt_cache_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embedding_cache.json");
        std::fs::write(&path, "{ not a cache").unwrap();

        let cache = EmbeddingCache::with_persistence(&path, 10).await.unwrap();
        assert!(cache.get("hello", "m", 1).await.is_none());

        cache.put("hello", "m", 1, vec![0.5]).await;
        cache.save().await.unwrap();
        let reopened = EmbeddingCache::with_persistence(&path, 10).await.unwrap();
        assert_eq!(reopened.get("hello", "m", 1).await, Some(vec![0.5]));
    }

    #[tokio::test]
    async fn test_cached_provider_keys_on_dimension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embedding_cache.json");

        let wide = CachedProvider::new(
            HashProvider::new().with_dimension(64),
            EmbeddingCache::with_persistence(&path, 10).await.unwrap(),
        );
        let first = wide
            .embed_batch(vec![EmbeddingRequest::new("Backend Developer")])
            .await
            .unwrap();
        assert_eq!(first[0].dimension, 64);

        let narrow = CachedProvider::new(
            HashProvider::new().with_dimension(32),
            EmbeddingCache::with_persistence(&path, 10).await.unwrap(),
        );
        let second = narrow
            .embed_batch(vec![EmbeddingRequest::new("Backend Developer")])
            .await
            .unwrap();
        assert_eq!(second[0].dimension, 32);

        let single = narrow
            .embed(EmbeddingRequest::new("Backend Developer"))
            .await
            .unwrap();
        assert_eq!(single.embedding, second[0].embedding);
    }

    #[tokio::test]
    async fn test_cached_batch_only_embeds_misses() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CachedProvider::new(
            CountingProvider {
                inner: HashProvider::new(),
                calls: Arc::clone(&calls),
            },
            EmbeddingCache::new(100),
        );

        let first = provider
            .embed_batch(vec![EmbeddingRequest::new("a"), EmbeddingRequest::new("b")])
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let second = provider
            .embed_batch(vec![
                EmbeddingRequest::new("b"),
                EmbeddingRequest::new("c"),
                EmbeddingRequest::new("a"),
            ])
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(second[0].embedding, first[1].embedding);
        assert_eq!(second[2].embedding, first[0].embedding);
    }
}
