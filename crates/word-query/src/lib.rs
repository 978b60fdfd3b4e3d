//! word-query - Hybrid retrieval over the term corpus
//!
//! This crate ranks corpus documents against a query with two retrievers
//! and fuses their rankings into one list.
//!
//! # Features
//!
//! - Dense retrieval (cosine or inner product over injected embeddings)
//! - Sparse retrieval (BM25 with a Korean-aware analyzer)
//! - Convex combination fusion of min-max normalized scores, or weighted RRF
//!
//! # Example
//!
//! ```rust,ignore
//! use word_query::HybridRetriever;
//! use std::sync::Arc;
//!
//! let retriever = HybridRetriever::build(corpus, embedder, config.retrieval).await?;
//! let retrieval = retriever.retrieve("금리가 뭐야?").await?;
//! for doc in retriever.documents(&retrieval.fused) {
//!     println!("{}", doc.title);
//! }
//! ```

mod dense;
mod engine;
mod fusion;
mod sparse;

pub use dense::DenseIndex;
pub use engine::{HybridRetriever, IndexStats, Retrieval};
pub use fusion::{
    convex_combination, fuse, min_max_normalize, normalize_weights, reciprocal_rank_fusion, top_k,
    WeightedList,
};
pub use sparse::{Bm25Index, KoreanTokenizer, Posting};

// Re-export for convenience
pub use word_core::{FusedResult, RankedHit};
