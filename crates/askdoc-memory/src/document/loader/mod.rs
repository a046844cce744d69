#[cfg(feature = "pdf")]
mod pdf;
mod text;

use std::path::Path;

#[cfg(feature = "pdf")]
pub use pdf::PdfLoader;
pub use text::TextLoader;

use super::{Document, DocumentError};

/// Loader chosen once per upload from the file extension.
#[derive(Debug, Clone)]
pub enum DocumentLoader {
    PlainText(TextLoader),
    #[cfg(feature = "pdf")]
    Pdf(PdfLoader),
}

impl DocumentLoader {
    /// Resolve the loader for `path` by its (case-insensitive) extension.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for extensions other than `txt`, `md`, `markdown`
    /// and (with the `pdf` feature) `pdf`.
    pub fn for_path(path: &Path) -> Result<Self, DocumentError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        Self::for_extension(&ext)
    }

    /// # Errors
    ///
    /// Returns `UnsupportedFormat` if no loader handles `ext`.
    pub fn for_extension(ext: &str) -> Result<Self, DocumentError> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        if TextLoader::SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(Self::PlainText(TextLoader::default()));
        }
        #[cfg(feature = "pdf")]
        if PdfLoader::SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(Self::Pdf(PdfLoader::default()));
        }
        let shown = if ext.is_empty() { "(none)".to_owned() } else { ext };
        Err(DocumentError::UnsupportedFormat(shown))
    }

    /// Apply the same size limit to whichever loader was selected.
    #[must_use]
    pub fn with_max_file_size(self, max_file_size: u64) -> Self {
        match self {
            Self::PlainText(_) => Self::PlainText(TextLoader { max_file_size }),
            #[cfg(feature = "pdf")]
            Self::Pdf(_) => Self::Pdf(PdfLoader { max_file_size }),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read, exceeds the size limit or fails to parse.
    pub async fn load(&self, path: &Path) -> Result<Document, DocumentError> {
        match self {
            Self::PlainText(loader) => loader.load(path).await,
            #[cfg(feature = "pdf")]
            Self::Pdf(loader) => loader.load(path).await,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlainText(_) => "text",
            #[cfg(feature = "pdf")]
            Self::Pdf(_) => "pdf",
        }
    }
}

async fn check_size(path: &Path, limit: u64) -> Result<(), DocumentError> {
    let size = tokio::fs::metadata(path).await?.len();
    if size > limit {
        return Err(DocumentError::FileTooLarge { size, limit });
    }
    Ok(())
}
