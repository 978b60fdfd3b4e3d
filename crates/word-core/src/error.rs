//! Error types for the word-rag system.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using WordError.
pub type Result<T> = std::result::Result<T, WordError>;

/// Errors that can occur in the word-rag system.
#[derive(Error, Debug)]
pub enum WordError {
    /// The corpus file is missing, unreadable or lacks required columns.
    #[error("Failed to load corpus from {}: {reason}", path.display())]
    CorpusLoad { path: PathBuf, reason: String },

    /// Embedding provider unavailable or returned a malformed response.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Generation provider unavailable, rate-limited or failed.
    #[error("Generation error: {message}")]
    Generation { message: String },

    /// Generation provider rejected the prompt under its content policy.
    #[error("Generation rejected by content policy: {message}")]
    ContentPolicy { message: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl WordError {
    /// Create a corpus load error.
    pub fn corpus_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorpusLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a generation error.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Create a content-policy rejection.
    pub fn content_policy(message: impl Into<String>) -> Self {
        Self::ContentPolicy {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for every failure raised by the generation provider.
    pub fn is_generation(&self) -> bool {
        matches!(self, Self::Generation { .. } | Self::ContentPolicy { .. })
    }

    /// True when the generation provider refused the prompt itself.
    pub fn is_content_policy(&self) -> bool {
        matches!(self, Self::ContentPolicy { .. })
    }

    /// Get a stable error code, suitable for the calling web layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CorpusLoad { .. } => "CORPUS_LOAD_ERROR",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Generation { .. } => "GENERATION_ERROR",
            Self::ContentPolicy { .. } => "CONTENT_POLICY",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
