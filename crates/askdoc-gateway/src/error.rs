use askdoc_core::{ErrorKind, RagError};
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("upload I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Rag(#[from] RagError),
}

#[derive(serde::Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(serde::Serialize)]
struct ErrorDetail<'a> {
    kind: &'a str,
    message: String,
}

pub(crate) fn rag_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::SessionNotFound => StatusCode::NOT_FOUND,
        ErrorKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::EmptyDocument => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::EmbeddingFailure | ErrorKind::GenerationFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::InvalidConfiguration
        | ErrorKind::DimensionMismatch
        | ErrorKind::Document
        | ErrorKind::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl GatewayError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Rag(err) => (rag_status(err.kind()), err.kind().as_str(), err.user_message()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::Multipart(err) => {
                let status = err.status();
                let kind = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "file_too_large"
                } else {
                    "bad_request"
                };
                (status, kind, err.body_text())
            }
            Self::Bind(..) | Self::Server(_) | Self::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Internal server error.".into(),
            ),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(kind, "request failed: {self}");
        } else {
            tracing::debug!(kind, "request rejected: {self}");
        }
        (
            status,
            Json(ErrorBody {
                error: ErrorDetail { kind, message },
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use askdoc_llm::LlmError;
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn session_not_found_is_404() {
        let resp = GatewayError::from(RagError::SessionNotFound("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["kind"], "session_not_found");
        assert_eq!(
            json["error"]["message"],
            "Session not found. Please upload a file first."
        );
    }

    #[tokio::test]
    async fn provider_failure_is_502_with_generic_message() {
        let err = RagError::GenerationFailure(LlmError::Other("upstream exploded".into()));
        let resp = GatewayError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(resp).await;
        assert!(!json["error"]["message"].as_str().unwrap().contains("exploded"));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            rag_status(ErrorKind::UnsupportedFormat),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            rag_status(ErrorKind::EmptyDocument),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(rag_status(ErrorKind::FileTooLarge), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            rag_status(ErrorKind::DimensionMismatch),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn bad_request_body() {
        let resp = GatewayError::BadRequest("missing file field".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["kind"], "bad_request");
    }
}
