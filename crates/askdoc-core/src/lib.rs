//! Configuration, session registry and the retrieval-augmented answering pipeline.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod secret;
pub mod service;
pub mod session;

pub use error::{ErrorKind, RagError};
pub use pipeline::{AnswerStream, DEFAULT_TOP_K, RagAnswer, RagPipeline};
pub use service::{QueryResult, RagService, RagSettings};
pub use session::{SessionId, SessionRegistry};
