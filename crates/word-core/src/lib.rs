//! word-core - Core types and traits for the word-rag system
//!
//! This crate provides the corpus data model, the capability traits the
//! retrieval core is wired against (embedding, generation, tokenization),
//! configuration and error handling shared by every other crate.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{Result, WordError};
pub use traits::*;
pub use types::*;
