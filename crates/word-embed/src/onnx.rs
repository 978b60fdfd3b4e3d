//! ONNX-based embedding model implementation.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::ArrayViewD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use word_core::{Embedder, Result, WordError};

/// Options for a local sentence-embedding model.
///
/// The defaults match multilingual-e5-small, which handles Korean text and
/// expects asymmetric `passage: ` / `query: ` prefixes.
#[derive(Debug, Clone)]
pub struct OnnxOptions {
    /// Output dimension of the model.
    pub dimension: usize,

    /// Maximum tokens per input; longer inputs are truncated.
    pub max_tokens: usize,

    /// Intra-op threads for CPU inference.
    pub num_threads: usize,

    /// Texts per `session.run`. Every row is padded to the longest text in
    /// its batch, so memory grows with batch size times sequence length.
    pub batch_size: usize,

    /// Prefix added to corpus texts.
    pub document_prefix: String,

    /// Prefix added to query texts.
    pub query_prefix: String,
}

impl Default for OnnxOptions {
    fn default() -> Self {
        Self {
            dimension: 384,
            max_tokens: 512,
            num_threads: 4,
            batch_size: 32,
            document_prefix: "passage: ".to_string(),
            query_prefix: "query: ".to_string(),
        }
    }
}

/// ONNX-based embedder.
pub struct OnnxEmbedder {
    /// Inference session (wrapped in Mutex: `run` needs `&mut`).
    session: Mutex<Session>,

    tokenizer: Tokenizer,

    options: OnnxOptions,
}

impl OnnxEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from a model directory.
    pub fn from_dir(model_dir: impl AsRef<Path>, options: OnnxOptions) -> Result<Self> {
        let dir = model_dir.as_ref();
        Self::new(dir.join("model.onnx"), dir.join("tokenizer.json"), options)
    }

    /// Create a new embedder from model and tokenizer paths.
    pub fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        options: OnnxOptions,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        info!("Loading ONNX model from {:?}", model_path);

        let session = Session::builder()
            .map_err(|e| WordError::embedding(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| WordError::embedding(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(options.num_threads)
            .map_err(|e| WordError::embedding(format!("Failed to set thread count: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| WordError::embedding(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| WordError::embedding(format!("Failed to load tokenizer: {}", e)))?;

        info!(
            "Embedder initialized: dim={}, max_tokens={}",
            options.dimension, options.max_tokens
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            options,
        })
    }

    /// Embed a batch of texts with a given prefix.
    fn embed_batch(&self, texts: &[&str], prefix: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let prefixed: Vec<String> = texts.iter().map(|t| format!("{}{}", prefix, t)).collect();

        let encodings = self
            .tokenizer
            .encode_batch(prefixed, true)
            .map_err(|e| WordError::embedding(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.options.max_tokens);
        let batch_size = encodings.len();

        debug!("Embedding batch: size={}, max_len={}", batch_size, max_len);

        // Right-pad every row to max_len
        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        for (i, encoding) in encodings.iter().enumerate() {
            let row = i * max_len;
            for (j, (&id, &mask)) in encoding
                .get_ids()
                .iter()
                .zip(encoding.get_attention_mask())
                .take(max_len)
                .enumerate()
            {
                input_ids[row + j] = i64::from(id);
                attention_mask[row + j] = i64::from(mask);
            }
        }

        let input_ids_tensor = Tensor::from_array((vec![batch_size, max_len], input_ids))
            .map_err(|e| WordError::embedding(format!("Failed to create input tensor: {}", e)))?;
        let attention_mask_tensor =
            Tensor::from_array((vec![batch_size, max_len], attention_mask.clone()))
                .map_err(|e| WordError::embedding(format!("Failed to create mask tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| WordError::embedding(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
            .map_err(|e| WordError::embedding(format!("Inference failed: {}", e)))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| WordError::embedding("No output tensor found"))?;

        let view = output
            .try_extract_array::<f32>()
            .map_err(|e| WordError::embedding(format!("Failed to extract tensor: {}", e)))?;

        match view.ndim() {
            // (batch, seq, hidden): token states, pool them
            3 => Ok(mean_pool(&view, &attention_mask, max_len)),
            // (batch, hidden): already pooled
            2 => Ok(view
                .outer_iter()
                .map(|row| l2_normalize(row.iter().copied().collect()))
                .collect()),
            _ => Err(WordError::embedding(format!(
                "Unexpected output shape: {:?}",
                view.shape()
            ))),
        }
    }
}

/// Attention-masked mean over the sequence axis, then L2 normalization.
fn mean_pool(tensor: &ArrayViewD<'_, f32>, attention_mask: &[i64], max_len: usize) -> Vec<Vec<f32>> {
    let shape = tensor.shape();
    let (batch_size, seq_len, hidden_dim) = (shape[0], shape[1], shape[2]);

    (0..batch_size)
        .map(|i| {
            let mask = &attention_mask[i * max_len..(i + 1) * max_len];
            let mut sum = vec![0.0f32; hidden_dim];
            let mut valid = 0usize;
            for (j, _) in mask.iter().enumerate().take(seq_len).filter(|(_, m)| **m == 1) {
                valid += 1;
                for (k, s) in sum.iter_mut().enumerate() {
                    *s += tensor[[i, j, k]];
                }
            }
            if valid == 0 {
                return sum;
            }
            l2_normalize(sum.into_iter().map(|s| s / valid as f32).collect())
        })
        .collect()
}

/// Run `embed` over consecutive chunks of at most `batch_size` texts and
/// concatenate the results in input order.
fn embed_in_batches<F>(texts: &[&str], batch_size: usize, mut embed: F) -> Result<Vec<Vec<f32>>>
where
    F: FnMut(&[&str]) -> Result<Vec<Vec<f32>>>,
{
    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = embed(batch)?;
        if vectors.len() != batch.len() {
            return Err(WordError::embedding(format!(
                "Expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }
        embeddings.extend(vectors);
    }
    Ok(embeddings)
}

fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        // Session is not Send; inference stays on the calling task
        debug!(
            "Embedding {} documents in batches of {}",
            texts.len(),
            self.options.batch_size
        );
        embed_in_batches(texts, self.options.batch_size, |batch| {
            self.embed_batch(batch, &self.options.document_prefix)
        })
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text], &self.options.query_prefix)?
            .into_iter()
            .next()
            .ok_or_else(|| WordError::embedding("No embedding returned"))
    }

    fn dimension(&self) -> usize {
        self.options.dimension
    }
}
