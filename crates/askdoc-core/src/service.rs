//! Upload ingestion and query entry points shared by every transport.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use askdoc_llm::{LlmError, LlmProvider};
use askdoc_memory::document::{DEFAULT_MAX_FILE_SIZE, DocumentLoader};
use askdoc_memory::{ScoredChunk, SplitterConfig, TextSplitter, VectorIndex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::RagError;
use crate::pipeline::{DEFAULT_TOP_K, RagAnswer, RagPipeline};
use crate::session::{SessionId, SessionRegistry};

/// Tunables for ingestion and querying.
#[derive(Debug, Clone)]
pub struct RagSettings {
    pub splitter: SplitterConfig,
    pub top_k: usize,
    pub embed_batch_size: usize,
    pub embedding_timeout: Duration,
    pub llm_timeout: Duration,
    pub max_sessions: usize,
    pub max_file_size: u64,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            splitter: SplitterConfig::default(),
            top_k: DEFAULT_TOP_K,
            embed_batch_size: 64,
            embedding_timeout: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(120),
            max_sessions: 0,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl RagSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            splitter: config.splitter_config(),
            top_k: config.rag.top_k,
            embed_batch_size: config.rag.embed_batch_size,
            embedding_timeout: Duration::from_secs(config.timeouts.embedding_seconds),
            llm_timeout: Duration::from_secs(config.timeouts.llm_seconds),
            max_sessions: config.session.max_sessions,
            max_file_size: config.rag.max_file_size,
        }
    }
}

/// Fully drained answer with the passages it was grounded on.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub answer: String,
    pub context: Vec<ScoredChunk>,
}

/// Owns the session registry and drives ingestion and querying through `P`.
pub struct RagService<P> {
    provider: P,
    registry: SessionRegistry,
    splitter: TextSplitter,
    settings: RagSettings,
}

impl<P: LlmProvider> RagService<P> {
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the chunk parameters are unusable.
    pub fn new(provider: P, mut settings: RagSettings) -> Result<Self, RagError> {
        let splitter = TextSplitter::new(settings.splitter)?;
        settings.embed_batch_size = settings.embed_batch_size.max(1);
        Ok(Self {
            provider,
            registry: SessionRegistry::with_capacity_limit(settings.max_sessions),
            splitter,
            settings,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    /// Chunk, embed and index `text`, then register it as a new session.
    ///
    /// Nothing is registered unless every step succeeds.
    ///
    /// # Errors
    ///
    /// Returns `EmptyDocument` for blank text, `EmbeddingFailure` if the provider
    /// fails or returns the wrong number of vectors, or `Index` on inconsistent
    /// embedding dimensions.
    pub async fn ingest(&self, text: &str) -> Result<SessionId, RagError> {
        // Whitespace would split into chunks that carry no text to retrieve.
        if text.trim().is_empty() {
            return Err(RagError::EmptyDocument);
        }
        let chunks = self.splitter.split(text);
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument);
        }

        let mut index = VectorIndex::with_capacity(chunks.len());
        for batch in chunks.chunks(self.settings.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embed_batch(&texts).await?;
            for (chunk, vector) in batch.iter().cloned().zip(vectors) {
                index.insert(chunk, vector)?;
            }
        }

        let chunk_count = index.len();
        let id = self.registry.create(index);
        tracing::info!(session_id = %id, chunks = chunk_count, "document ingested");
        Ok(id)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let timeout = self.settings.embedding_timeout;
        let vectors = tokio::time::timeout(timeout, self.provider.embed_batch(texts))
            .await
            .map_err(|_| RagError::EmbeddingFailure(LlmError::Timeout(timeout)))?
            .map_err(RagError::EmbeddingFailure)?;
        if vectors.len() != texts.len() {
            return Err(RagError::EmbeddingFailure(LlmError::EmbeddingCount {
                provider: "embedding",
                expected: texts.len(),
                actual: vectors.len(),
            }));
        }
        Ok(vectors)
    }

    /// Load a file with the loader matching its extension and ingest its text.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for unknown extensions, `Document` for read,
    /// size and parse failures, and anything [`ingest`](Self::ingest) returns.
    pub async fn ingest_file(&self, path: &Path) -> Result<SessionId, RagError> {
        let loader =
            DocumentLoader::for_path(path)?.with_max_file_size(self.settings.max_file_size);
        tracing::debug!(path = %path.display(), loader = loader.kind(), "loading upload");
        let document = loader.load(path).await?;
        self.ingest(&document.content).await
    }

    fn pipeline(&self, session_id: &SessionId) -> Result<RagPipeline<'_, P>, RagError> {
        let index = self.registry.get(session_id)?;
        Ok(RagPipeline::new(&self.provider, index)
            .with_top_k(self.settings.top_k)
            .with_timeouts(self.settings.embedding_timeout, self.settings.llm_timeout))
    }

    /// Retrieve context and start streaming the answer for `question`.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for unknown ids and any pipeline failure.
    pub async fn answer_stream(
        &self,
        session_id: &SessionId,
        question: &str,
    ) -> Result<RagAnswer, RagError> {
        let pipeline = self.pipeline(session_id)?;
        tracing::debug!(session_id = %session_id, "answering question");
        pipeline.answer(question).await
    }

    /// Answer `question` and drain the whole response.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for unknown ids and any pipeline or generation failure.
    pub async fn answer(
        &self,
        session_id: &SessionId,
        question: &str,
    ) -> Result<QueryResult, RagError> {
        let RagAnswer { context, stream } = self.answer_stream(session_id, question).await?;
        let answer = stream.collect_text().await?;
        Ok(QueryResult { answer, context })
    }

    /// Like [`answer`](Self::answer), abandoning generation when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if the token fires before the answer is complete.
    pub async fn answer_with_cancel(
        &self,
        session_id: &SessionId,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, RagError> {
        let RagAnswer { context, stream } = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RagError::Cancelled),
            answer = self.answer_stream(session_id, question) => answer?,
        };
        let answer = stream.collect_text_with_cancel(cancel).await?;
        Ok(QueryResult { answer, context })
    }

    /// Drop every session.
    pub fn shutdown(&self) {
        let dropped = self.registry.clear();
        tracing::info!(sessions = dropped, "session registry cleared");
    }
}

impl<P: LlmProvider + 'static> RagService<P> {
    /// Periodically evict sessions idle for longer than `ttl` until `cancel` fires.
    #[must_use]
    pub fn spawn_eviction(
        self: &Arc<Self>,
        ttl: Duration,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = service.registry.evict_idle(ttl);
                        if evicted > 0 {
                            tracing::info!(evicted, remaining = service.registry.len(), "evicted idle sessions");
                        }
                    }
                }
            }
            tracing::debug!("session sweeper stopped");
        })
    }
}
