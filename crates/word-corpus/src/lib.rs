//! word-corpus - Corpus loading
//!
//! Parses the tabular economic-term corpus into immutable [`Document`]s.
//! The row order of the source defines each document's identifier.
//!
//! # Example
//!
//! ```rust,ignore
//! use word_corpus::CorpusLoader;
//!
//! let corpus = CorpusLoader::new().load("data/700words.csv")?;
//! println!("{} terms, fingerprint {}", corpus.len(), corpus.fingerprint());
//! ```

mod loader;

pub use loader::{CorpusLoader, REQUIRED_COLUMNS};

// Re-export types for convenience
pub use word_core::{Corpus, Document, DocumentId};
