//! Embedding providers.
//!
//! Supports any OpenAI-compatible embedding endpoint (hosted OpenAI or a
//! self-hosted sentence-transformer server) and an offline hashing model.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EmbeddingError, Result};
use crate::similarity::normalize;
use crate::{DEFAULT_DIMENSION, DEFAULT_MODEL, Embedding};

/// Hosted OpenAI endpoint. Requests to it require an API key.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Inputs sent per `/embeddings` request unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,

    /// Model to use (provider-specific).
    pub model: Option<String>,

    /// Dimensions for the output (if supported by provider).
    pub dimensions: Option<usize>,
}

impl EmbeddingRequest {
    /// Create a new embedding request.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            dimensions: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the output dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embedding.
    pub embedding: Embedding,

    /// Model used to generate the embedding.
    pub model: String,

    /// Dimension of the embedding.
    pub dimension: usize,

    /// Token usage (if available).
    pub tokens_used: Option<u64>,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Get the default embedding dimension.
    fn default_dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Generate embeddings for multiple texts.
    ///
    /// Results are returned in request order.
    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.embed(request).await?);
        }
        Ok(results)
    }
}

/// Provider for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAIProvider {
    /// API key. Optional for self-hosted endpoints.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,

    /// Output dimension override.
    dimensions: Option<usize>,

    /// Maximum inputs per request.
    batch_size: usize,
}

impl OpenAIProvider {
    /// Create a provider for the endpoint at `base_url`, requesting
    /// [`DEFAULT_MODEL`].
    ///
    /// No API key is set; [`OPENAI_BASE_URL`] needs one via
    /// [`OpenAIProvider::with_api_key`].
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            default_model: DEFAULT_MODEL.to_string(),
            dimensions: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Pin the output dimension.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Cap the number of inputs sent in one request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    fn post(&self, body: &serde_json::Value) -> Result<reqwest::RequestBuilder> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(body);

        match &self.api_key {
            Some(key) => builder = builder.header("Authorization", format!("Bearer {key}")),
            None if self.base_url == OPENAI_BASE_URL => {
                return Err(EmbeddingError::ProviderNotConfigured(
                    "OPENAI_API_KEY is not set".to_string(),
                ));
            }
            None => {}
        }

        Ok(builder)
    }

    async fn send(&self, body: serde_json::Value) -> Result<OpenAIEmbeddingResponse> {
        let response = self.post(&body)?.send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "{status}: {error_text}"
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn default_dimension(&self) -> usize {
        if let Some(dims) = self.dimensions {
            return dims;
        }
        match self.default_model.as_str() {
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            "text-embedding-3-large" => 3072,
            "all-MiniLM-L6-v2" => 384,
            _ => DEFAULT_DIMENSION,
        }
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = request.model.unwrap_or_else(|| self.default_model.clone());

        debug!("Generating embedding with model: {model}");

        let mut body = serde_json::json!({
            "input": request.text,
            "model": model
        });

        if let Some(dims) = request.dimensions.or(self.dimensions) {
            body["dimensions"] = serde_json::json!(dims);
        }

        let result = self.send(body).await?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))?
            .embedding;

        let dimension = embedding.len();
        let tokens_used = result.usage.map(|u| u.total_tokens);

        debug!("Generated embedding with {dimension} dimensions");

        Ok(EmbeddingResponse {
            embedding,
            model: result.model,
            dimension,
            tokens_used,
        })
    }

    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let model = requests[0]
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut responses = Vec::with_capacity(requests.len());
        for chunk in requests.chunks(self.batch_size) {
            let texts: Vec<&str> = chunk.iter().map(|r| r.text.as_str()).collect();

            debug!(
                "Generating batch embeddings for {} texts with model: {model}",
                texts.len()
            );

            let mut body = serde_json::json!({
                "input": texts,
                "model": model
            });

            if let Some(dims) = self.dimensions {
                body["dimensions"] = serde_json::json!(dims);
            }

            let mut result = self.send(body).await?;

            if result.data.len() != chunk.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    chunk.len(),
                    result.data.len()
                )));
            }

            result.data.sort_by_key(|item| item.index);
            let response_model = result.model;

            responses.extend(result.data.into_iter().map(|item| EmbeddingResponse {
                dimension: item.embedding.len(),
                embedding: item.embedding,
                model: response_model.clone(),
                tokens_used: None,
            }));
        }

        info!("Generated {} batch embeddings", responses.len());

        Ok(responses)
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
    model: String,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    total_tokens: u64,
}

/// Offline embedding model based on feature hashing.
///
/// Each lowercased alphanumeric token is hashed into one of `dimension`
/// buckets with a hash-derived sign, and the result is L2-normalized. Texts
/// sharing vocabulary land close together, which is enough for title-weighted
/// matching without a model server.
pub struct HashProvider {
    dimension: usize,
}

impl HashProvider {
    /// Default bucket count.
    pub const DEFAULT_DIMENSION: usize = 384;

    /// Create a hashing provider with the default dimension.
    pub fn new() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
        }
    }

    /// Set the number of buckets.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension.max(1);
        self
    }

    /// Embed text synchronously.
    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut embedding = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        normalize(&mut embedding);
        embedding
    }
}

impl Default for HashProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingProvider for HashProvider {
    fn name(&self) -> &str {
        "hash"
    }

    fn default_model(&self) -> &str {
        "feature-hash"
    }

    fn default_dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let embedding = self.embed_text(&request.text);
        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model: self.default_model().to_string(),
            tokens_used: Some(tokenize(&request.text).count() as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Answers with one embedding per input, `[position, 0.0]`.
    struct EchoEmbeddings;

    impl Respond for EchoEmbeddings {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: serde_json::Value = request.body_json().unwrap_or_default();
            let count = body["input"].as_array().map_or(0, Vec::len);
            let data: Vec<serde_json::Value> = (0..count)
                .map(|i| serde_json::json!({"embedding": [i as f32, 0.0], "index": i}))
                .collect();
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": data, "model": "m"}))
        }
    }

    #[test]
    fn test_embedding_request() {
        let request = EmbeddingRequest::new("Hello world")
            .with_model("text-embedding-3-small")
            .with_dimensions(512);

        assert_eq!(request.text, "Hello world");
        assert_eq!(request.model, Some("text-embedding-3-small".to_string()));
        assert_eq!(request.dimensions, Some(512));
    }

    #[test]
    fn test_openai_provider_default_dimensions() {
        let provider = OpenAIProvider::new(OPENAI_BASE_URL).with_model("text-embedding-3-large");
        assert_eq!(provider.default_dimension(), 3072);

        let provider = OpenAIProvider::new("http://localhost:8080/v1/");
        assert_eq!(provider.default_dimension(), DEFAULT_DIMENSION);
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/embeddings");

        let provider = provider.with_dimensions(256);
        assert_eq!(provider.default_dimension(), 256);
    }

    #[tokio::test]
    async fn test_hosted_openai_requires_key() {
        let provider = OpenAIProvider::new(OPENAI_BASE_URL);

        let err = provider.embed(EmbeddingRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::ProviderNotConfigured(_)));
    }

    #[tokio::test]
    async fn test_self_hosted_embed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}],
                "model": "all-mpnet-base-v2",
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            })))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new(format!("{}/v1", server.uri()));
        let response = provider.embed(EmbeddingRequest::new("Backend")).await.unwrap();

        assert_eq!(response.embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(response.dimension, 3);
        assert_eq!(response.tokens_used, Some(2));
    }

    #[tokio::test]
    async fn test_batch_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [0.0, 1.0], "index": 1},
                    {"embedding": [1.0, 0.0], "index": 0}
                ],
                "model": "m"
            })))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new(server.uri()).with_api_key("secret");
        let responses = provider
            .embed_batch(vec![EmbeddingRequest::new("a"), EmbeddingRequest::new("b")])
            .await
            .unwrap();

        assert_eq!(responses[0].embedding, vec![1.0, 0.0]);
        assert_eq!(responses[1].embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_batch_is_split_into_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(EchoEmbeddings)
            .expect(3)
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new(server.uri()).with_batch_size(2);
        let requests = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(EmbeddingRequest::new)
            .collect();
        let responses = provider.embed_batch(requests).await.unwrap();

        let firsts: Vec<f32> = responses.iter().map(|r| r.embedding[0]).collect();
        assert_eq!(firsts, vec![0.0, 1.0, 0.0, 1.0, 0.0]);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new(server.uri());
        let err = provider.embed(EmbeddingRequest::new("x")).await.unwrap_err();

        assert!(matches!(
            err,
            EmbeddingError::RateLimited {
                retry_after_secs: 7
            }
        ));
    }

    #[tokio::test]
    async fn test_hash_provider_is_deterministic() {
        let provider = HashProvider::new();
        let a = provider.embed(EmbeddingRequest::new("Backend Developer")).await.unwrap();
        let b = provider.embed(EmbeddingRequest::new("backend, developer")).await.unwrap();

        assert_eq!(a.dimension, HashProvider::DEFAULT_DIMENSION);
        assert_eq!(a.embedding, b.embedding);
    }

    #[test]
    fn test_hash_provider_prefers_shared_vocabulary() {
        let provider = HashProvider::new();
        let query = provider.embed_text("Backend Developer Backend Developer");
        let close = provider.embed_text("Backend Developer - Build APIs.");
        let far = provider.embed_text("Product Manager - Own the roadmap.");

        let close_score = cosine_similarity(&query, &close).unwrap();
        let far_score = cosine_similarity(&query, &far).unwrap();
        assert!(close_score > far_score);
    }

    #[test]
    fn test_hash_provider_empty_text() {
        let provider = HashProvider::new().with_dimension(8);
        assert_eq!(provider.embed_text("  - "), vec![0.0; 8]);
    }
}
