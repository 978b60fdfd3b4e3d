//! word-answer - Answer synthesis for word-rag
//!
//! This crate turns fused retrieval results into a "today's word" answer:
//! it renders the prompt template with the query and the retrieved
//! documents, and sends it to a text-generation provider.
//!
//! [`RetrievalService`] is the entrypoint the surrounding application
//! holds: build it once with [`RetrievalService::initialize`], then call
//! [`RetrievalService::generate_response`] per request. Synchronous callers
//! use [`BlockingRetrievalService`], which owns its runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! use word_answer::{generate_with_fallback, OpenAiGenerator, RetrievalService};
//! use std::sync::Arc;
//!
//! let embedder = word_embed::from_config(&config.embedding)?;
//! let generator = Arc::new(OpenAiGenerator::from_config(&config.generation)?);
//! let service = RetrievalService::initialize(config, embedder, generator).await?;
//! let text = generate_with_fallback(&service, "금리가 뭐야?", "시장 경제 활동").await?;
//! ```

mod fallback;
mod generator;
mod prompt;
mod service;
mod synthesizer;

pub use fallback::{answer_with_fallback, generate_with_fallback};
pub use generator::{EchoGenerator, MockGenerator, OpenAiGenerator};
pub use prompt::{PromptTemplate, CONTENTS_PLACEHOLDER, DEFAULT_PROMPT_TEMPLATE, QUERY_PLACEHOLDER};
pub use service::{Answer, BlockingRetrievalService, RetrievalService};
pub use synthesizer::AnswerSynthesizer;

// Re-export for convenience
pub use word_core::{GenerationParams, Generator};
