use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use tokio_stream::StreamExt;

use crate::error::LlmError;
use crate::provider::{ChatStream, LlmProvider, Message, Role};

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
    embedding_model: String,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: &str, model: String, embedding_model: String) -> Self {
        let (host, port) = parse_host_port(base_url);
        Self {
            client: Ollama::new(host, port),
            model,
            embedding_model,
        }
    }

    /// Check if Ollama is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection to Ollama fails.
    pub async fn health_check(&self) -> Result<(), LlmError> {
        self.client.list_local_models().await.map_err(|e| {
            LlmError::Other(format!("failed to connect to Ollama, is it running? {e}"))
        })?;
        Ok(())
    }

    async fn generate_embeddings(&self, input: EmbeddingsInput) -> Result<Vec<Vec<f32>>, LlmError> {
        let request = GenerateEmbeddingsRequest::new(self.embedding_model.clone(), input);
        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| LlmError::Other(format!("Ollama embedding request failed: {e}")))?;
        Ok(response.embeddings)
    }
}

impl LlmProvider for OllamaProvider {
    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError> {
        let ollama_messages: Vec<ChatMessage> = messages.iter().map(convert_message).collect();
        let request = ChatMessageRequest::new(self.model.clone(), ollama_messages);

        let stream = self
            .client
            .send_chat_messages_stream(request)
            .await
            .map_err(|e| LlmError::Other(format!("Ollama streaming request failed: {e}")))?;

        let mapped = stream.filter_map(|item| match item {
            Ok(response) if response.message.content.is_empty() => None,
            Ok(response) => Some(Ok(response.message.content)),
            Err(()) => Some(Err(LlmError::Other("Ollama stream chunk failed".into()))),
        });

        Ok(Box::pin(mapped))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.generate_embeddings(EmbeddingsInput::from(text))
            .await?
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse { provider: "ollama" })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self
            .generate_embeddings(EmbeddingsInput::Multiple(texts.to_vec()))
            .await?;
        if vectors.len() != texts.len() {
            return Err(LlmError::EmbeddingCount {
                provider: "ollama",
                expected: texts.len(),
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ollama"
    }
}

fn convert_message(msg: &Message) -> ChatMessage {
    let text = msg.content.clone();
    match msg.role {
        Role::System => ChatMessage::system(text),
        Role::Assistant => ChatMessage::assistant(text),
        Role::User => ChatMessage::user(text),
    }
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), 11434)
}
