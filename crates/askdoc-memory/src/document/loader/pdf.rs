use std::path::Path;

use super::super::{DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentMetadata};
use super::check_size;

#[derive(Debug, Clone)]
pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl PdfLoader {
    pub const SUPPORTED_EXTENSIONS: &'static [&'static str] = &["pdf"];

    /// Extract the text of every page, concatenated in page order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, exceeds `max_file_size` or is not a valid PDF.
    pub async fn load(&self, path: &Path) -> Result<Document, DocumentError> {
        check_size(path, self.max_file_size).await?;

        let source = path.display().to_string();
        let path_buf = path.to_path_buf();
        let content = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text(&path_buf).map_err(|e| DocumentError::Pdf(e.to_string()))
        })
        .await
        .map_err(|e| DocumentError::Io(std::io::Error::other(e)))??;
        tracing::debug!(path = %source, chars = content.len(), "extracted PDF text");

        Ok(Document {
            content,
            metadata: DocumentMetadata {
                source,
                content_type: "application/pdf".to_owned(),
            },
        })
    }
}
