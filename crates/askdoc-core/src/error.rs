use askdoc_llm::LlmError;
use askdoc_memory::document::{DocumentError, SplitterError};
use askdoc_memory::IndexError;

/// Coarse classification used by transports to pick a status and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfiguration,
    DimensionMismatch,
    EmptyDocument,
    UnsupportedFormat,
    FileTooLarge,
    Document,
    EmbeddingFailure,
    GenerationFailure,
    SessionNotFound,
    Cancelled,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidConfiguration => "invalid_configuration",
            Self::DimensionMismatch => "dimension_mismatch",
            Self::EmptyDocument => "empty_document",
            Self::UnsupportedFormat => "unsupported_format",
            Self::FileTooLarge => "file_too_large",
            Self::Document => "document",
            Self::EmbeddingFailure => "embedding_failure",
            Self::GenerationFailure => "generation_failure",
            Self::SessionNotFound => "session_not_found",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error(transparent)]
    InvalidConfiguration(#[from] SplitterError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("document contains no text")]
    EmptyDocument,

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("document error: {0}")]
    Document(DocumentError),

    #[error("embedding failed: {0}")]
    EmbeddingFailure(#[source] LlmError),

    #[error("generation failed: {0}")]
    GenerationFailure(#[source] LlmError),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("request cancelled")]
    Cancelled,
}

impl From<DocumentError> for RagError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::UnsupportedFormat(ext) => Self::UnsupportedFormat(ext),
            other => Self::Document(other),
        }
    }
}

impl RagError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Self::Index(_) => ErrorKind::DimensionMismatch,
            Self::EmptyDocument => ErrorKind::EmptyDocument,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Document(DocumentError::FileTooLarge { .. }) => ErrorKind::FileTooLarge,
            Self::Document(_) => ErrorKind::Document,
            Self::EmbeddingFailure(_) => ErrorKind::EmbeddingFailure,
            Self::GenerationFailure(_) => ErrorKind::GenerationFailure,
            Self::SessionNotFound(_) => ErrorKind::SessionNotFound,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Message safe to show to clients; provider and I/O details stay in logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::SessionNotFound(_) => "Session not found. Please upload a file first.".into(),
            Self::UnsupportedFormat(ext) => format!("Unsupported file type: {ext}"),
            Self::EmptyDocument => "The uploaded document contains no text.".into(),
            Self::Document(DocumentError::FileTooLarge { limit, .. }) => {
                format!("The uploaded file exceeds the {limit} byte limit.")
            }
            Self::Document(DocumentError::Pdf(_)) => "The uploaded PDF could not be read.".into(),
            Self::EmbeddingFailure(_) | Self::GenerationFailure(_) => {
                "The language model service failed to respond. Please try again later.".into()
            }
            Self::Cancelled => "The request was cancelled.".into(),
            Self::InvalidConfiguration(_) | Self::Index(_) | Self::Document(_) => {
                "Internal server error.".into()
            }
        }
    }
}
