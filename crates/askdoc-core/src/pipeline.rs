//! Retrieval and grounded answer generation over a single session's index.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use askdoc_llm::{ChatStream, LlmError, LlmProvider, Message};
use askdoc_memory::{ScoredChunk, VectorIndex};
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::RagError;

pub const DEFAULT_TOP_K: usize = 4;

pub const SYSTEM_PROMPT: &str = "Use the following context to answer a users question. \
If you cannot find the answer in the context, say you don't know the answer.";

const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the grounded prompt: fixed instruction, retrieved passages, then the question.
#[must_use]
pub fn build_messages(context: &[ScoredChunk], question: &str) -> Vec<Message> {
    let joined = context
        .iter()
        .map(|c| c.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(format!("Context:\n{joined}\n\nQuestion:\n{question}\n")),
    ]
}

/// Answer fragments from the provider, pulled on demand.
///
/// Dropping the stream drops the upstream response and aborts generation.
/// The stream ends after the first provider error.
pub struct AnswerStream {
    inner: ChatStream,
    failed: bool,
}

impl AnswerStream {
    #[must_use]
    pub fn new(inner: ChatStream) -> Self {
        Self {
            inner,
            failed: false,
        }
    }

    /// Drain every fragment into one string.
    ///
    /// # Errors
    ///
    /// Returns `GenerationFailure` if the provider stream yields an error.
    pub async fn collect_text(mut self) -> Result<String, RagError> {
        let mut answer = String::new();
        while let Some(fragment) = self.next().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }

    /// Like [`collect_text`](Self::collect_text) but stops as soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` when the token fires first, or `GenerationFailure`
    /// if the provider stream yields an error.
    pub async fn collect_text_with_cancel(
        self,
        cancel: &CancellationToken,
    ) -> Result<String, RagError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RagError::Cancelled),
            result = self.collect_text() => result,
        }
    }
}

impl Stream for AnswerStream {
    type Item = Result<String, RagError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.failed {
            return Poll::Ready(None);
        }
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Err(e))) => {
                self.failed = true;
                Poll::Ready(Some(Err(RagError::GenerationFailure(e))))
            }
            Poll::Ready(Some(Ok(fragment))) => Poll::Ready(Some(Ok(fragment))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for AnswerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerStream").finish_non_exhaustive()
    }
}

/// Retrieved context plus the not-yet-consumed answer.
#[derive(Debug)]
pub struct RagAnswer {
    pub context: Vec<ScoredChunk>,
    pub stream: AnswerStream,
}

/// Query pipeline bound to one session's index.
pub struct RagPipeline<'a, P> {
    provider: &'a P,
    index: Arc<VectorIndex>,
    top_k: usize,
    embedding_timeout: Duration,
    llm_timeout: Duration,
}

impl<'a, P: LlmProvider> RagPipeline<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P, index: Arc<VectorIndex>) -> Self {
        Self {
            provider,
            index,
            top_k: DEFAULT_TOP_K,
            embedding_timeout: DEFAULT_EMBEDDING_TIMEOUT,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, embedding: Duration, llm: Duration) -> Self {
        self.embedding_timeout = embedding;
        self.llm_timeout = llm;
        self
    }

    /// Retrieve context for `question` and start streaming the answer.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingFailure` if the question cannot be embedded, `Index` if the
    /// embedding does not match the index dimension, or `GenerationFailure` if the
    /// provider refuses to start the stream.
    pub async fn answer(&self, question: &str) -> Result<RagAnswer, RagError> {
        let embedding = tokio::time::timeout(self.embedding_timeout, self.provider.embed(question))
            .await
            .map_err(|_| RagError::EmbeddingFailure(LlmError::Timeout(self.embedding_timeout)))?
            .map_err(RagError::EmbeddingFailure)?;

        let context = self.index.search(&embedding, self.top_k)?;
        tracing::debug!(top_k = self.top_k, retrieved = context.len(), "retrieved context");

        let messages = build_messages(&context, question);
        let stream = tokio::time::timeout(self.llm_timeout, self.provider.chat_stream(&messages))
            .await
            .map_err(|_| RagError::GenerationFailure(LlmError::Timeout(self.llm_timeout)))?
            .map_err(RagError::GenerationFailure)?;

        Ok(RagAnswer {
            context,
            stream: AnswerStream::new(stream),
        })
    }
}
