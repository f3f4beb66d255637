//! Client for an OpenAI-compatible `/embeddings` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use finrag_core::config::EmbeddingSettings;
use finrag_core::traits::Embedder;
use finrag_core::{Error, Result};

pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    dim: usize,
    id: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig("missing embedding API key".into()))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
            api_key,
            dim: settings.dim,
            id: format!("openai:{}:d{}", settings.model, settings.dim),
        })
    }

    /// Only the v3 model family accepts a requested output dimension.
    fn requested_dimensions(&self) -> Option<usize> {
        self.model.starts_with("text-embedding-3").then_some(self.dim)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingRequest { model: &self.model, input: texts, dimensions: self.requested_dimensions() };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::EmbeddingUnavailable(format!("request to {} timed out", self.endpoint))
                } else {
                    Error::EmbeddingUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(Error::EmbeddingUnavailable(format!("embedding endpoint rejected credentials ({status})")));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingUnavailable(format!("embedding endpoint returned {status}: {message}")));
        }
        let parsed: EmbeddingResponse =
            response.json().await.map_err(|e| Error::EmbeddingUnavailable(format!("JSON parse error: {e}")))?;
        tracing::debug!(count = parsed.data.len(), model = %self.model, "received embeddings");
        order_embeddings(parsed, texts.len(), self.dim)
    }
}

/// Responses may arrive out of order; place each vector by its `index` and
/// check shape.
fn order_embeddings(response: EmbeddingResponse, expected: usize, dim: usize) -> Result<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        return Err(Error::EmbeddingUnavailable(format!("expected {expected} embeddings, got {}", response.data.len())));
    }
    let mut out: Vec<Option<Vec<f32>>> = vec![None; expected];
    for datum in response.data {
        if datum.embedding.len() != dim {
            return Err(Error::EmbeddingUnavailable(format!("dim mismatch: got {} expected {dim}", datum.embedding.len())));
        }
        let slot = out
            .get_mut(datum.index)
            .ok_or_else(|| Error::EmbeddingUnavailable(format!("embedding index {} out of range", datum.index)))?;
        *slot = Some(datum.embedding);
    }
    out.into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| Error::EmbeddingUnavailable(format!("missing embedding for input {i}"))))
        .collect()
}
