use eventsource_stream::Eventsource;
use serde::Deserialize;
use tokio_stream::StreamExt;

use crate::error::LlmError;
use crate::provider::ChatStream;

/// Convert an OpenAI-style streaming response into a `ChatStream`.
pub(crate) fn openai_sse_to_stream(response: reqwest::Response) -> ChatStream {
    let event_stream = response.bytes_stream().eventsource();
    let mapped = event_stream.filter_map(|event| match event {
        Ok(event) => parse_openai_sse_event(&event.data),
        Err(e) => Some(Err(LlmError::SseParse(e.to_string()))),
    });
    Box::pin(mapped)
}

fn parse_openai_sse_event(data: &str) -> Option<Result<String, LlmError>> {
    if data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<OpenAiStreamChunk>(data) {
        Ok(chunk) => {
            let content = chunk
                .choices
                .first()
                .and_then(|c| c.delta.content.as_deref())
                .unwrap_or_default();

            if content.is_empty() {
                None
            } else {
                Some(Ok(content.to_owned()))
            }
        }
        Err(e) => Some(Err(LlmError::SseParse(format!(
            "failed to parse SSE data: {e}"
        )))),
    }
}

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
}

#[derive(Deserialize)]
struct OpenAiStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_chunk() {
        let data = r#"{"choices":[{"delta":{"content":"hi"},"finish_reason":null}]}"#;
        let result = parse_openai_sse_event(data);
        assert_eq!(result.unwrap().unwrap(), "hi");
    }

    #[test]
    fn parse_done_signal() {
        assert!(parse_openai_sse_event("[DONE]").is_none());
    }

    #[test]
    fn parse_empty_content() {
        let data = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert!(parse_openai_sse_event(data).is_none());
    }

    #[test]
    fn parse_role_only_delta() {
        let data = r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#;
        assert!(parse_openai_sse_event(data).is_none());
    }

    #[test]
    fn parse_no_choices() {
        let data = r#"{"choices":[]}"#;
        assert!(parse_openai_sse_event(data).is_none());
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_openai_sse_event("not json").unwrap().unwrap_err();
        assert!(err.to_string().contains("failed to parse SSE data"));
    }
}
