//! Embedding and streaming chat providers used by the askdoc retrieval pipeline.

pub mod any;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;
mod sse;

pub use any::AnyProvider;
pub use error::LlmError;
pub use provider::{ChatStream, LlmProvider, Message, Role};
