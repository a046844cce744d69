//! Test-only mock LLM provider.

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio_stream::StreamExt;

use crate::error::LlmError;
use crate::provider::{ChatStream, LlmProvider, Message};

const DEFAULT_DIMENSION: usize = 64;

/// Deterministic in-process provider.
///
/// Embeddings are hashed bag-of-words vectors, so texts sharing words score
/// higher under cosine similarity. Completions replay queued responses one
/// character per fragment.
#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    pub dimension: usize,
    pub fail_embed: bool,
    pub fail_chat: bool,
    pub stall_after_first: bool,
    /// Streams emit one fragment, then an error, then the rest of the response.
    pub error_after_first: bool,
    /// Milliseconds to sleep before returning an embedding.
    pub embed_delay_ms: u64,
    last_messages: Arc<Mutex<Option<Vec<Message>>>>,
    embed_calls: Arc<AtomicUsize>,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
    streams_dropped: Arc<AtomicUsize>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            dimension: DEFAULT_DIMENSION,
            fail_embed: false,
            fail_chat: false,
            stall_after_first: false,
            error_after_first: false,
            embed_delay_ms: 0,
            last_messages: Arc::new(Mutex::new(None)),
            embed_calls: Arc::new(AtomicUsize::new(0)),
            batch_sizes: Arc::new(Mutex::new(Vec::new())),
            streams_dropped: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_embed() -> Self {
        Self {
            fail_embed: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_chat() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    /// Streams emit one fragment and then never resolve.
    #[must_use]
    pub fn with_stalled_stream(mut self) -> Self {
        self.stall_after_first = true;
        self
    }

    #[must_use]
    pub fn with_stream_error(mut self) -> Self {
        self.error_after_first = true;
        self
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    #[must_use]
    pub fn with_embed_delay(mut self, ms: u64) -> Self {
        self.embed_delay_ms = ms;
        self
    }

    /// Messages passed to the most recent `chat_stream` call.
    #[must_use]
    pub fn last_messages(&self) -> Option<Vec<Message>> {
        self.last_messages.lock().unwrap().clone()
    }

    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Length of each `embed_batch` call, in call order.
    #[must_use]
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    /// Number of completion streams dropped so far, drained or not.
    #[must_use]
    pub fn streams_dropped(&self) -> usize {
        self.streams_dropped.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> String {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            self.default_response.clone()
        } else {
            responses.remove(0)
        }
    }
}

/// Hashed bag-of-words embedding over lowercase alphanumeric tokens.
#[must_use]
pub fn bag_of_words(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dimension];
    if dimension == 0 {
        return vector;
    }
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.to_lowercase().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        #[expect(clippy::cast_possible_truncation)]
        let bucket = (hash % dimension as u64) as usize;
        vector[bucket] += 1.0;
    }
    vector
}

struct TrackedStream {
    inner: ChatStream,
    dropped: Arc<AtomicUsize>,
}

impl Stream for TrackedStream {
    type Item = Result<String, LlmError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl LlmProvider for MockProvider {
    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError> {
        *self.last_messages.lock().unwrap() = Some(messages.to_vec());
        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }

        let response = self.next_response();
        let inner: ChatStream = if self.stall_after_first {
            let first = response.chars().next().map(String::from).unwrap_or_default();
            Box::pin(tokio_stream::iter(vec![Ok(first)]).chain(tokio_stream::pending()))
        } else if self.error_after_first {
            let mut chunks: Vec<_> = response.chars().map(|c| Ok(c.to_string())).collect();
            chunks.insert(
                chunks.len().min(1),
                Err(LlmError::Other("mock stream error".into())),
            );
            Box::pin(tokio_stream::iter(chunks))
        } else {
            let chunks: Vec<_> = response.chars().map(|c| Ok(c.to_string())).collect();
            Box::pin(tokio_stream::iter(chunks))
        };

        Ok(Box::pin(TrackedStream {
            inner,
            dropped: Arc::clone(&self.streams_dropped),
        }))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.embed_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.embed_delay_ms)).await;
        }
        if self.fail_embed {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(bag_of_words(text, self.dimension))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.batch_sizes.lock().unwrap().push(texts.len());
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}
