//! Document loading, chunking and brute-force vector search over embedded chunks.

pub mod document;
pub mod vector_index;

pub use document::{Chunk, Document, DocumentError, DocumentLoader, SplitterConfig, TextSplitter};
pub use vector_index::{IndexError, ScoredChunk, VectorIndex};
