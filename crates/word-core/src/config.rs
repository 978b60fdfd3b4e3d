//! Configuration types for the word-rag system.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::DEFAULT_CONTENT_TEMPLATE;

/// Main configuration for the word-rag system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordConfig {
    /// Corpus configuration.
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Embedding configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Retrieval and fusion configuration.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Generation configuration.
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Corpus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Path to the CSV corpus (columns: title, content, related_keyword).
    #[serde(default = "default_corpus_path")]
    pub path: PathBuf,

    /// Template for each document's indexed text.
    #[serde(default = "default_content_template")]
    pub content_template: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
            content_template: default_content_template(),
        }
    }
}

/// Embedding backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAi,
    /// Local ONNX model.
    Onnx,
    /// Deterministic feature hashing, no model required.
    Hashing,
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend to use.
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProvider,

    /// Remote model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Path to the ONNX model directory (model.onnx + tokenizer.json).
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Dimension of the hashing embedder.
    #[serde(default = "default_hashing_dimension")]
    pub hashing_dimension: usize,

    /// Batch size for embedding.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of threads for CPU inference.
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            model_path: default_model_path(),
            hashing_dimension: default_hashing_dimension(),
            batch_size: default_batch_size(),
            num_threads: default_num_threads(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// How two rankings are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMethod {
    /// Convex combination of min-max normalized scores.
    #[default]
    Cc,
    /// Weighted reciprocal rank fusion.
    Rrf,
}

/// Dense similarity metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    #[default]
    Cosine,
    InnerProduct,
}

/// BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Config {
    /// Term frequency saturation.
    #[serde(default = "default_k1")]
    pub k1: f32,

    /// Length normalization.
    #[serde(default = "default_b")]
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results taken from the dense retriever.
    #[serde(default = "default_k")]
    pub dense_k: usize,

    /// Results taken from the sparse retriever.
    #[serde(default = "default_k")]
    pub sparse_k: usize,

    /// Fused documents passed to the synthesizer.
    #[serde(default = "default_k")]
    pub top_k: usize,

    /// Retriever weights as `[dense, sparse]`; normalized internally.
    #[serde(default = "default_weights")]
    pub weights: [f32; 2],

    /// Fusion method.
    #[serde(default)]
    pub method: FusionMethod,

    /// RRF constant, used when `method = "rrf"`.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,

    /// Dense similarity metric.
    #[serde(default)]
    pub similarity: Similarity,

    /// BM25 parameters.
    #[serde(default)]
    pub bm25: Bm25Config,

    /// Index overlapping syllable bigrams of long Hangul stems.
    #[serde(default = "default_true")]
    pub compound_bigrams: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            dense_k: 3,
            sparse_k: 3,
            top_k: 3,
            weights: default_weights(),
            method: FusionMethod::Cc,
            rrf_k: 60,
            similarity: Similarity::Cosine,
            bm25: Bm25Config::default(),
            compound_bigrams: true,
        }
    }
}

/// Generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Chat model name.
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Optional cap on generated tokens.
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Prompt template file; the built-in template is used when unset.
    #[serde(default)]
    pub prompt_template_path: Option<PathBuf>,

    /// Substitute query retried once after a content-policy rejection.
    #[serde(default = "default_fallback_query")]
    pub fallback_query: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: None,
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            prompt_template_path: None,
            fallback_query: default_fallback_query(),
        }
    }
}

impl GenerationConfig {
    /// Sampling parameters for the generator.
    pub fn params(&self) -> crate::traits::GenerationParams {
        crate::traits::GenerationParams {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("data").join("700words.csv")
}

fn default_content_template() -> String {
    DEFAULT_CONTENT_TEMPLATE.to_string()
}

fn default_embedding_provider() -> EmbeddingProvider {
    EmbeddingProvider::OpenAi
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_hashing_dimension() -> usize {
    256
}

fn default_batch_size() -> usize {
    64
}

fn default_num_threads() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_k() -> usize {
    3
}

fn default_weights() -> [f32; 2] {
    [0.77, 0.23]
}

fn default_rrf_k() -> u32 {
    60
}

fn default_k1() -> f32 {
    1.5
}

fn default_b() -> f32 {
    0.75
}

fn default_generation_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.8
}

fn default_fallback_query() -> Option<String> {
    Some("시장 경제 활동".to_string())
}

fn default_model_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("word-rag")
        .join("models")
        .join("multilingual-e5-small")
}

impl WordConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::WordError::config(format!("Failed to parse config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> crate::error::Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("word-rag").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("word-rag.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> crate::error::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::error::WordError::config(format!("Failed to render config: {}", e)))
    }

    /// Reject values the retrieval core cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::WordError;

        let r = &self.retrieval;
        if r.dense_k == 0 || r.sparse_k == 0 || r.top_k == 0 {
            return Err(WordError::config("retrieval k values must be at least 1"));
        }
        if r.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(WordError::config("retrieval weights must be non-negative"));
        }
        if r.weights.iter().sum::<f32>() <= 0.0 {
            return Err(WordError::config("retrieval weights must not all be zero"));
        }
        if !r.bm25.k1.is_finite() || r.bm25.k1 < 0.0 || !(0.0..=1.0).contains(&r.bm25.b) {
            return Err(WordError::config("bm25 requires k1 >= 0 and 0 <= b <= 1"));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(WordError::config("temperature must be within [0, 2]"));
        }
        if self.embedding.batch_size == 0 {
            return Err(WordError::config("embedding batch_size must be at least 1"));
        }
        if !self.corpus.content_template.contains("{title}")
            && !self.corpus.content_template.contains("{body}")
        {
            return Err(WordError::config(
                "content_template must reference {title} or {body}",
            ));
        }
        Ok(())
    }
}
