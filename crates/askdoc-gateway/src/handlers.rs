use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use askdoc_core::{QueryResult, RagAnswer, RagError, SessionId};
use askdoc_memory::ScoredChunk;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::{Stream, StreamExt};

use super::error::GatewayError;
use super::server::AppState;

const FILE_FIELD: &str = "file";
pub(crate) const UPLOAD_PREFIX: &str = "askdoc-upload-";

#[derive(serde::Serialize)]
struct UploadResponse {
    session_id: SessionId,
    message: &'static str,
}

#[derive(serde::Deserialize)]
pub(crate) struct QueryRequest {
    pub session_id: String,
    pub question: String,
}

#[derive(serde::Serialize)]
struct QueryResponse {
    answer: String,
    context: Vec<String>,
}

#[derive(serde::Serialize)]
struct TokenPayload<'a> {
    text: &'a str,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    sessions: usize,
    uptime_secs: u64,
    oldest_session_secs: Option<u64>,
}

fn context_texts(context: Vec<ScoredChunk>) -> Vec<String> {
    context.into_iter().map(|c| c.chunk.content).collect()
}

/// Accept a multipart upload, persist it to a temp file in `upload_dir` named
/// with the original extension, and ingest it. The temp file is removed when
/// this handler returns.
pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, GatewayError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let suffix = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let bytes = field.bytes().await?;

        let temp = tempfile::Builder::new()
            .prefix(UPLOAD_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&state.upload_dir)?;
        tokio::fs::write(temp.path(), &bytes).await?;
        tracing::info!(file = %file_name, bytes = bytes.len(), "received upload");

        let session_id = state.service.ingest_file(temp.path()).await?;
        return Ok(Json(UploadResponse {
            session_id,
            message: "File processed successfully",
        }));
    }
    Err(GatewayError::BadRequest(format!(
        "multipart field '{FILE_FIELD}' is required"
    )))
}

pub(crate) async fn query_handler(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let session_id = SessionId::from(req.session_id);
    let QueryResult { answer, context } = state.service.answer(&session_id, &req.question).await?;
    Ok(Json(QueryResponse {
        answer,
        context: context_texts(context),
    }))
}

/// Server-sent events: one `context` event, then `token` events, then `done`.
///
/// A failure after the stream has started is reported as a final `error` event
/// in place of `done`.
pub(crate) async fn query_stream_handler(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, GatewayError> {
    let session_id = SessionId::from(req.session_id);
    let RagAnswer { context, stream } = state
        .service
        .answer_stream(&session_id, &req.question)
        .await?;

    let head = tokio_stream::once(
        Event::default()
            .event("context")
            .json_data(context_texts(context)),
    );
    let failed = Arc::new(AtomicBool::new(false));
    let tokens = {
        let failed = Arc::clone(&failed);
        stream.map(move |item| match item {
            Ok(text) => Event::default()
                .event("token")
                .json_data(TokenPayload { text: &text }),
            Err(err) => {
                failed.store(true, Ordering::Relaxed);
                Ok(error_event(&err))
            }
        })
    };
    let tail = tokio_stream::iter([()]).filter_map(move |()| {
        (!failed.load(Ordering::Relaxed)).then(|| Ok(Event::default().event("done").data("")))
    });

    let events = head.chain(tokens).chain(tail).map(|event| {
        Ok(event.unwrap_or_else(|e| {
            tracing::warn!("failed to encode SSE event: {e}");
            Event::default().event("error").data("encoding failure")
        }))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn error_event(err: &RagError) -> Event {
    tracing::warn!(kind = %err.kind(), "answer stream failed: {err}");
    let body = serde_json::json!({
        "kind": err.kind().as_str(),
        "message": err.user_message(),
    });
    Event::default().event("error").data(body.to_string())
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        sessions: state.service.registry().len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        oldest_session_secs: state.service.registry().oldest_age().map(|age| age.as_secs()),
    })
}
