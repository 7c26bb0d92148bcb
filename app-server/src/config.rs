//! Server configuration.

use std::path::Path;

use anyhow::Context;
use jdrec_retrieval::RecommenderConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the HTTP server.
///
/// Loaded from TOML; every field is optional:
///
/// ```toml
/// host = "127.0.0.1"
/// port = 8000
///
/// [recommender]
/// corpus_path = "jds.json"
/// storage_path = "jdrec_store"
///
/// [recommender.embedding]
/// provider = "openai"
/// base_url = "http://127.0.0.1:8080/v1"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub recommender: RecommenderConfig,
}

impl ServerConfig {
    /// Read a configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            recommender: RecommenderConfig::default(),
        }
    }
}
