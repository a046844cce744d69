/// Where a document came from and how it was decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub source: String,
    pub content_type: String,
}

/// Flat text extracted from an uploaded file.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// Contiguous window of document text, numbered in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub index: usize,
}
