use super::types::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl SplitterConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `chunk_size` is zero or `chunk_overlap >= chunk_size`.
    pub fn validate(&self) -> Result<(), SplitterError> {
        if self.chunk_size == 0 {
            return Err(SplitterError::InvalidConfiguration(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(SplitterError::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SplitterError {
    #[error("invalid splitter configuration: {0}")]
    InvalidConfiguration(String),
}

/// Fixed-size character window splitter.
///
/// Windows are measured in Unicode scalar values and advance by
/// `chunk_size - chunk_overlap`, so consecutive chunks share exactly
/// `chunk_overlap` characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the window parameters are unusable.
    pub fn new(config: SplitterConfig) -> Result<Self, SplitterError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> SplitterConfig {
        self.config
    }

    #[must_use]
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let size = self.config.chunk_size;
        let step = size - self.config.chunk_overlap;
        let mut chunks = Vec::with_capacity(chars.len().div_ceil(step));
        let mut start = 0;

        loop {
            let end = (start + size).min(chars.len());
            chunks.push(Chunk {
                content: chars[start..end].iter().collect(),
                index: chunks.len(),
            });
            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Validate the parameters and split `text` in one call.
///
/// # Errors
///
/// Returns `InvalidConfiguration` if `chunk_size` is zero or `overlap >= chunk_size`.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, SplitterError> {
    let splitter = TextSplitter::new(SplitterConfig {
        chunk_size,
        chunk_overlap: overlap,
    })?;
    Ok(splitter.split(text))
}
