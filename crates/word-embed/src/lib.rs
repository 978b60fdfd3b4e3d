//! word-embed - Embedding providers
//!
//! Implementations of the [`Embedder`] capability used by the dense
//! retriever:
//!
//! - [`OpenAiEmbedder`]: OpenAI-compatible `/embeddings` HTTP endpoint
//! - [`OnnxEmbedder`]: local ONNX model with mean pooling and L2 normalization
//! - [`HashingEmbedder`]: deterministic character n-gram feature hashing,
//!   for offline runs and tests

mod hashing;
mod onnx;
mod openai;

use std::sync::Arc;
use std::time::Duration;

pub use hashing::HashingEmbedder;
pub use onnx::{OnnxEmbedder, OnnxOptions};
pub use openai::OpenAiEmbedder;

// Re-export the Embedder trait for convenience
pub use word_core::Embedder;

use word_core::{EmbeddingConfig, EmbeddingProvider, Result, WordError};

/// Build the embedder selected by configuration.
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.provider {
        EmbeddingProvider::OpenAi => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                WordError::config(format!("environment variable {} is not set", config.api_key_env))
            })?;
            Arc::new(
                OpenAiEmbedder::new(
                    &config.endpoint,
                    &config.model,
                    api_key,
                    Duration::from_secs(config.timeout_secs),
                )?
                .with_batch_size(config.batch_size),
            )
        }
        EmbeddingProvider::Onnx => Arc::new(OnnxEmbedder::from_dir(
            &config.model_path,
            onnx_options(config),
        )?),
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::with_dimension(
            config.hashing_dimension,
        )),
    };
    Ok(embedder)
}

fn onnx_options(config: &EmbeddingConfig) -> OnnxOptions {
    OnnxOptions {
        num_threads: config.num_threads,
        batch_size: config.batch_size,
        ..OnnxOptions::default()
    }
}
