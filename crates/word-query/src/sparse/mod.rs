//! Sparse lexical retrieval: Korean-aware tokenization and BM25 scoring.

mod bm25;
mod tokenizer;

pub use bm25::{Bm25Index, Posting};
pub(crate) use bm25::by_score_then_id;
pub use tokenizer::KoreanTokenizer;
