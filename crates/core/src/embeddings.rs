use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

pub const GEMINI_EMBEDDING_MODEL: &str = "models/embedding-001";
pub const EMBEDDING_DIMENSION: usize = 768;

const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Result of one embedding request. A degraded outcome carries a zero
/// vector of the configured dimensionality so callers can keep going while
/// still telling real embeddings apart from fallbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutcome {
    Computed(Vec<f32>),
    Degraded(Vec<f32>),
}

impl EmbeddingOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, EmbeddingOutcome::Degraded(_))
    }

    pub fn into_vector(self) -> Vec<f32> {
        match self {
            EmbeddingOutcome::Computed(vector) | EmbeddingOutcome::Degraded(vector) => vector,
        }
    }
}

/// Embedding collaborator. `embed` never fails: internal errors degrade to
/// a zero vector.
#[async_trait]
pub trait Embedder {
    fn dimensions(&self) -> usize;
    fn model_name(&self) -> &str;
    async fn embed(&self, text: &str) -> EmbeddingOutcome;
}

/// Client for the Gemini `embedContent` REST endpoint.
pub struct GeminiEmbedder {
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
    client: Client,
}

impl GeminiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_GEMINI_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: GEMINI_EMBEDDING_MODEL.to_string(),
            dimensions: EMBEDDING_DIMENSION,
            client: Client::new(),
        }
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let url = format!(
            "{}/{}:embedContent?key={}",
            self.endpoint, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "content": { "parts": [{ "text": text }] },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "gemini".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let values = parsed
            .pointer("/embedding/values")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::BackendResponse {
                backend: "gemini".to_string(),
                details: "response has no embedding values".to_string(),
            })?;

        let vector: Vec<f32> = values
            .iter()
            .filter_map(Value::as_f64)
            .map(|value| value as f32)
            .collect();

        if vector.len() != self.dimensions {
            return Err(SearchError::BackendResponse {
                backend: "gemini".to_string(),
                details: format!(
                    "embedding has {} dimensions, expected {}",
                    vector.len(),
                    self.dimensions
                ),
            });
        }

        Ok(vector)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> EmbeddingOutcome {
        match self.request_embedding(text).await {
            Ok(vector) => EmbeddingOutcome::Computed(vector),
            Err(error) => {
                warn!(error = %error, "embedding request failed, substituting zero vector");
                EmbeddingOutcome::Degraded(vec![0.0; self.dimensions])
            }
        }
    }
}
