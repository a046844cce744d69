#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("{provider} returned {actual} embeddings for {expected} inputs")]
    EmbeddingCount {
        provider: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("SSE parse error: {0}")]
    SseParse(String),

    #[error("{provider} API request failed (status {status})")]
    Status {
        provider: &'static str,
        status: u16,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;
