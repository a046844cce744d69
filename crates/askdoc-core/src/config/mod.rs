mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};
use askdoc_memory::SplitterConfig;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to sensible defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.splitter_config()
            .validate()
            .context("invalid [rag] chunk settings")?;
        if self.rag.top_k == 0 {
            bail!("rag.top_k must be at least 1");
        }
        if self.rag.embed_batch_size == 0 {
            bail!("rag.embed_batch_size must be at least 1");
        }
        if self.gateway.port == 0 {
            bail!("gateway.port must not be 0");
        }
        if self.session.idle_ttl_secs > 0 && self.session.sweep_interval_secs == 0 {
            bail!("session.sweep_interval_secs must be at least 1 when idle_ttl_secs is set");
        }
        if self.timeouts.llm_seconds == 0 || self.timeouts.embedding_seconds == 0 {
            bail!("timeouts must be at least 1 second");
        }
        Ok(())
    }

    #[must_use]
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.rag.chunk_size,
            chunk_overlap: self.rag.chunk_overlap,
        }
    }
}
