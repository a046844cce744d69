use std::path::Path;

use super::super::{DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentMetadata};
use super::check_size;

#[derive(Debug, Clone)]
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl TextLoader {
    pub const SUPPORTED_EXTENSIONS: &'static [&'static str] = &["txt", "md", "markdown"];

    /// Read the file as UTF-8; invalid sequences are replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or exceeds `max_file_size`.
    pub async fn load(&self, path: &Path) -> Result<Document, DocumentError> {
        check_size(path, self.max_file_size).await?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let content_type = match ext.as_str() {
            "md" | "markdown" => "text/markdown",
            _ => "text/plain",
        };

        let bytes = tokio::fs::read(path).await?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        tracing::debug!(path = %path.display(), chars = content.len(), "loaded text document");

        Ok(Document {
            content,
            metadata: DocumentMetadata {
                source: path.display().to_string(),
                content_type: content_type.to_owned(),
            },
        })
    }
}
