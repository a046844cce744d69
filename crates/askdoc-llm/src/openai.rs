use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{ChatStream, LlmProvider, Message};
use crate::sse::openai_sse_to_stream;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    embedding_model: String,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        max_tokens: u32,
        embedding_model: String,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
            max_tokens,
            embedding_model,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(format!("{}/{endpoint}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI {endpoint} error {status}: {text}");
            return Err(LlmError::Status {
                provider: "openai",
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn request_embeddings(&self, input: EmbeddingInput<'_>) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = EmbeddingRequest {
            input,
            model: &self.embedding_model,
        };
        let response = self.post_json("embeddings", &body).await?;
        let text = response.text().await?;
        let mut resp: EmbeddingResponse = serde_json::from_str(&text)?;
        resp.data.sort_by_key(|d| d.index);
        Ok(resp.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: self.max_tokens,
            stream: true,
        };
        let response = self.post_json("chat/completions", &body).await?;
        Ok(openai_sse_to_stream(response))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.request_embeddings(EmbeddingInput::Single(text))
            .await?
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse { provider: "openai" })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self
            .request_embeddings(EmbeddingInput::Batch(texts))
            .await?;
        if vectors.len() != texts.len() {
            return Err(LlmError::EmbeddingCount {
                provider: "openai",
                expected: texts.len(),
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai"
    }
}

fn convert_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .map(|msg| ApiMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        })
        .collect()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: EmbeddingInput<'a>,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_provider(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            "sk-test".into(),
            base_url.into(),
            "gpt-4o-mini".into(),
            512,
            "text-embedding-3-small".into(),
        )
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let p = test_provider("https://api.openai.com/v1/");
        assert_eq!(p.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn debug_redacts_api_key() {
        let p = test_provider(DEFAULT_BASE_URL);
        let dbg = format!("{p:?}");
        assert!(!dbg.contains("sk-test"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn name_returns_openai() {
        assert_eq!(test_provider(DEFAULT_BASE_URL).name(), "openai");
    }

    #[test]
    fn chat_request_serialization() {
        let messages = [Message::system("be brief"), Message::user("hello")];
        let api_messages = convert_messages(&messages);
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: &api_messages,
            max_tokens: 100,
            stream: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn embedding_input_serializes_untagged() {
        let texts = vec!["a".to_owned(), "b".to_owned()];
        let single = serde_json::to_value(EmbeddingInput::Single("x")).unwrap();
        let batch = serde_json::to_value(EmbeddingInput::Batch(&texts)).unwrap();
        assert_eq!(single, serde_json::json!("x"));
        assert_eq!(batch, serde_json::json!(["a", "b"]));
    }

    #[tokio::test]
    async fn embed_batch_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"input": ["first", "second"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .mount(&server)
            .await;

        let p = test_provider(&server.uri());
        let vectors = p
            .embed_batch(&["first".to_owned(), "second".to_owned()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn embed_batch_empty_input_skips_request() {
        let p = test_provider("http://127.0.0.1:1");
        let vectors = p.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn embed_batch_count_mismatch_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [1.0]}]
            })))
            .mount(&server)
            .await;

        let p = test_provider(&server.uri());
        let err = p
            .embed_batch(&["a".to_owned(), "b".to_owned()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::EmbeddingCount {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn embed_single_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [0.5, 0.5, 0.0]}]
            })))
            .mount(&server)
            .await;

        let v = test_provider(&server.uri()).embed("hello").await.unwrap();
        assert_eq!(v, vec![0.5, 0.5, 0.0]);
    }

    #[tokio::test]
    async fn embed_empty_data_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let err = test_provider(&server.uri()).embed("x").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn rate_limited_status_maps_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = test_provider(&server.uri()).embed("x").await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited));
    }

    #[tokio::test]
    async fn server_error_maps_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = test_provider(&server.uri())
            .chat_stream(&[Message::user("hi")])
            .await;
        match result {
            Err(LlmError::Status { status, .. }) => assert_eq!(status, 500),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected status error"),
        }
    }

    #[tokio::test]
    async fn chat_stream_yields_fragments() {
        let server = MockServer::start().await;
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Grass \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"is green.\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let mut stream = test_provider(&server.uri())
            .chat_stream(&[Message::user("What color is grass?")])
            .await
            .unwrap();
        let mut out = String::new();
        while let Some(fragment) = stream.next().await {
            out.push_str(&fragment.unwrap());
        }
        assert_eq!(out, "Grass is green.");
    }

    #[tokio::test]
    async fn unreachable_endpoint_errors() {
        let p = test_provider("http://127.0.0.1:1");
        assert!(p.embed("x").await.is_err());
        assert!(p.chat_stream(&[Message::user("x")]).await.is_err());
    }
}
