//! Collection registry with optional on-disk persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jdrec_embeddings::{EmbeddingProvider, SimilarityIndex};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::collection::{Collection, CollectionSnapshot};
use crate::error::{Result, StoreError};

const SNAPSHOT_EXTENSION: &str = "json";

/// A set of named collections.
///
/// Created with [`VectorStore::in_memory`] or [`VectorStore::open`]; the
/// latter writes one `<name>.json` snapshot per collection under its root and
/// reloads them on the next open.
pub struct VectorStore {
    /// Snapshot directory, if persistent.
    root: Option<PathBuf>,

    /// Collection data by name.
    collections: RwLock<HashMap<String, Arc<RwLock<SimilarityIndex>>>>,
}

impl VectorStore {
    /// Create a store that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self {
            root: None,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Open a persistent store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;

        let mut collections = HashMap::new();
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != SNAPSHOT_EXTENSION) {
                continue;
            }

            match load_snapshot(&path).await {
                Ok((name, index)) => {
                    debug!("Loaded collection {name} ({} documents)", index.len());
                    collections.insert(name, Arc::new(RwLock::new(index)));
                }
                Err(e) => {
                    warn!("Skipping unreadable collection snapshot {}: {e}", path.display());
                }
            }
        }

        info!(
            "Opened vector store at {} with {} collections",
            root.display(),
            collections.len()
        );

        Ok(Self {
            root: Some(root),
            collections: RwLock::new(collections),
        })
    }

    /// Snapshot directory, if persistent.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn snapshot_path(&self, name: &str) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(format!("{name}.{SNAPSHOT_EXTENSION}")))
    }

    /// Names of all collections, sorted.
    pub async fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check whether a collection exists.
    pub async fn has_collection(&self, name: &str) -> bool {
        self.collections.read().await.contains_key(name)
    }

    /// Create an empty collection bound to `provider`.
    pub async fn create_collection(
        &self,
        name: &str,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Collection> {
        validate_name(name)?;

        let data = {
            let mut collections = self.collections.write().await;
            if collections.contains_key(name) {
                return Err(StoreError::CollectionExists(name.to_string()));
            }
            let data = Arc::new(RwLock::new(SimilarityIndex::new()));
            collections.insert(name.to_string(), Arc::clone(&data));
            data
        };

        if let Some(path) = self.snapshot_path(name) {
            let snapshot = CollectionSnapshot {
                name: name.to_string(),
                entries: Vec::new(),
            };
            fs::write(&path, serde_json::to_string(&snapshot)?).await?;
        }

        info!("Created collection {name} (provider: {})", provider.name());
        Ok(Collection::new(
            name.to_string(),
            data,
            provider,
            self.snapshot_path(name),
        ))
    }

    /// Open an existing collection bound to `provider`.
    pub async fn get_collection(
        &self,
        name: &str,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Collection> {
        let data = self
            .collections
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        Ok(Collection::new(
            name.to_string(),
            data,
            provider,
            self.snapshot_path(name),
        ))
    }

    /// Delete a collection and its snapshot.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        let removed = self.collections.write().await.remove(name);
        if removed.is_none() {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }

        if let Some(path) = self.snapshot_path(name) {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!("Deleted collection {name}");
        Ok(())
    }
}

async fn load_snapshot(path: &Path) -> Result<(String, SimilarityIndex)> {
    let content = fs::read_to_string(path).await?;
    let snapshot: CollectionSnapshot = serde_json::from_str(&content)?;
    let index = SimilarityIndex::from_entries(snapshot.entries)?;
    Ok((snapshot.name, index))
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}
