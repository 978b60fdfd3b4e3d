//! OpenAI-compatible embeddings client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use word_core::{Embedder, Result, WordError};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// Failures are reported as [`WordError::Embedding`] and never retried here.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    batch_size: usize,
    dimension: AtomicUsize,
}

impl OpenAiEmbedder {
    /// Create a client for `model` at `endpoint` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WordError::embedding(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.into(),
            batch_size: 64,
            dimension: AtomicUsize::new(known_dimension(model)),
        })
    }

    /// Set the maximum number of texts per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.endpoint);
        debug!("Calling embeddings API: {} items", texts.len());

        let request = EmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| WordError::embedding(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(WordError::embedding(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| WordError::embedding(format!("Failed to parse response: {}", e)))?;

        order_embeddings(body, texts.len())
    }

    fn record_dimension(&self, vectors: &[Vec<f32>]) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        if let Some(bad) = vectors.iter().find(|v| v.len() != first.len()) {
            return Err(WordError::embedding(format!(
                "Inconsistent embedding dimensions: {} and {}",
                first.len(),
                bad.len()
            )));
        }
        self.dimension.store(first.len(), Ordering::Relaxed);
        Ok(())
    }
}

/// Restore request order (the API reports each item's index) and check the count.
fn order_embeddings(body: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if body.data.len() != expected {
        return Err(WordError::embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            body.data.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in body.data {
        let slot = slots
            .get_mut(item.index)
            .ok_or_else(|| WordError::embedding(format!("Embedding index {} out of range", item.index)))?;
        *slot = Some(item.embedding);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| WordError::embedding(format!("Missing embedding {}", i))))
        .collect()
}

fn known_dimension(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        _ => 0,
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.request(batch).await?);
        }
        self.record_dimension(&embeddings)?;
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.request(&[text]).await?;
        self.record_dimension(&embeddings)?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| WordError::embedding("No embedding returned"))
    }

    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }
}
