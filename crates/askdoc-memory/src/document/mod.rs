pub mod error;
pub mod loader;
pub mod splitter;
pub mod types;

pub use error::DocumentError;
pub use loader::{DocumentLoader, TextLoader};
pub use splitter::{SplitterConfig, SplitterError, TextSplitter, split_text};
pub use types::{Chunk, Document, DocumentMetadata};

#[cfg(feature = "pdf")]
pub use loader::PdfLoader;

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
