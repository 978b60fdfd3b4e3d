//! Capability traits the retrieval core is wired against.
//!
//! Embedding and generation are external collaborators: the core never
//! retries them and surfaces their failures to the caller unchanged.

use async_trait::async_trait;

use crate::error::Result;

/// Embedding model trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of corpus texts (called once, at index build time).
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;
}

/// Sampling parameters passed with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Model identifier understood by the provider.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Optional cap on generated tokens.
    pub max_tokens: Option<u32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.8,
            max_tokens: None,
        }
    }
}

/// Text generation trait.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Complete a prompt.
    ///
    /// A content-policy refusal must be reported as
    /// [`WordError::ContentPolicy`](crate::WordError::ContentPolicy).
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

/// Lexical analyzer used by the sparse retriever.
pub trait Tokenizer: Send + Sync {
    /// Split text into index terms.
    fn tokenize(&self, text: &str) -> Vec<String>;
}
