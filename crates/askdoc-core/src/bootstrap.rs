//! Application bootstrap: config resolution and provider construction.

use std::path::PathBuf;

use anyhow::Context;
use askdoc_llm::any::AnyProvider;
use askdoc_llm::ollama::OllamaProvider;
use askdoc_llm::openai::OpenAiProvider;

use crate::config::{Config, ProviderKind};

/// Priority: CLI `--config` > `ASKDOC_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path() -> PathBuf {
    let args: Vec<String> = std::env::args().collect();
    resolve_config_path_from(&args, std::env::var("ASKDOC_CONFIG").ok())
}

fn resolve_config_path_from(args: &[String], env: Option<String>) -> PathBuf {
    if let Some(path) = args.windows(2).find(|w| w[0] == "--config").map(|w| &w[1]) {
        return PathBuf::from(path);
    }
    if let Some(path) = env {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// Build the configured provider.
///
/// # Errors
///
/// Returns an error if the OpenAI provider is selected without an API key.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    match config.llm.provider {
        ProviderKind::OpenAi => {
            let api_key = config
                .secrets
                .openai_api_key
                .as_ref()
                .context("ASKDOC_OPENAI_API_KEY or OPENAI_API_KEY must be set for the openai provider")?
                .expose()
                .to_owned();
            Ok(AnyProvider::OpenAi(OpenAiProvider::new(
                api_key,
                config.llm.base_url.clone(),
                config.llm.model.clone(),
                config.llm.max_tokens,
                config.llm.embedding_model.clone(),
            )))
        }
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &config.llm.base_url,
            config.llm.model.clone(),
            config.llm.embedding_model.clone(),
        ))),
    }
}

pub async fn health_check(provider: &AnyProvider) {
    if let AnyProvider::Ollama(ollama) = provider {
        match ollama.health_check().await {
            Ok(()) => tracing::info!("ollama health check passed"),
            Err(e) => tracing::warn!("ollama health check failed: {e:#}"),
        }
    }
}
