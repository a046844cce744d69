use std::io::Write;

use serial_test::serial;

use super::*;

const ENV_KEYS: [&str; 20] = [
    "ASKDOC_LLM_PROVIDER",
    "ASKDOC_LLM_BASE_URL",
    "ASKDOC_LLM_MODEL",
    "ASKDOC_LLM_EMBEDDING_MODEL",
    "ASKDOC_LLM_MAX_TOKENS",
    "ASKDOC_TIMEOUT_LLM",
    "ASKDOC_TIMEOUT_EMBEDDING",
    "ASKDOC_RAG_CHUNK_SIZE",
    "ASKDOC_RAG_CHUNK_OVERLAP",
    "ASKDOC_RAG_TOP_K",
    "ASKDOC_RAG_EMBED_BATCH_SIZE",
    "ASKDOC_SESSION_IDLE_TTL",
    "ASKDOC_SESSION_SWEEP_INTERVAL",
    "ASKDOC_SESSION_MAX",
    "ASKDOC_GATEWAY_BIND",
    "ASKDOC_GATEWAY_PORT",
    "ASKDOC_GATEWAY_MAX_BODY_SIZE",
    "ASKDOC_GATEWAY_CORS_ORIGINS",
    "ASKDOC_OPENAI_API_KEY",
    "OPENAI_API_KEY",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.llm.embedding_model, "text-embedding-3-small");
    assert_eq!(config.rag.chunk_size, 1000);
    assert_eq!(config.rag.chunk_overlap, 200);
    assert_eq!(config.rag.top_k, 4);
    assert_eq!(config.rag.embed_batch_size, 64);
    assert_eq!(config.session.idle_ttl_secs, 3600);
    assert_eq!(config.session.max_sessions, 0);
    assert_eq!(config.gateway.bind, "127.0.0.1");
    assert_eq!(
        config.gateway.cors_origins,
        vec!["http://localhost:8080", "http://localhost:5173"]
    );
    assert!(config.secrets.openai_api_key.is_none());
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn load_missing_file_uses_defaults() {
    clear_env();
    let config = Config::load(Path::new("/nonexistent/askdoc.toml")).unwrap();
    assert_eq!(config.rag.chunk_size, 1000);
    assert_eq!(config.gateway.port, 8000);
}

#[test]
#[serial]
fn load_partial_file_fills_defaults() {
    clear_env();
    let file = write_config(
        r#"
[llm]
provider = "ollama"
base_url = "http://localhost:11434"
model = "llama3.2"
embedding_model = "nomic-embed-text"

[rag]
chunk_size = 500
chunk_overlap = 50
"#,
    );
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.llm.provider, ProviderKind::Ollama);
    assert_eq!(config.llm.model, "llama3.2");
    assert_eq!(config.rag.chunk_size, 500);
    assert_eq!(config.rag.chunk_overlap, 50);
    assert_eq!(config.rag.top_k, 4);
    assert_eq!(config.timeouts.llm_seconds, 120);
}

#[test]
#[serial]
fn load_invalid_toml_errors() {
    clear_env();
    let file = write_config("[rag\nchunk_size = ");
    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}

#[test]
#[serial]
fn env_overrides_file() {
    clear_env();
    let file = write_config("[rag]\ntop_k = 2\n");
    unsafe {
        std::env::set_var("ASKDOC_RAG_TOP_K", "7");
        std::env::set_var("ASKDOC_LLM_PROVIDER", "ollama");
        std::env::set_var("ASKDOC_GATEWAY_PORT", "9100");
        std::env::set_var("ASKDOC_SESSION_MAX", "3");
        std::env::set_var("ASKDOC_TIMEOUT_EMBEDDING", "5");
    }
    let config = Config::load(file.path()).unwrap();
    clear_env();
    assert_eq!(config.rag.top_k, 7);
    assert_eq!(config.llm.provider, ProviderKind::Ollama);
    assert_eq!(config.gateway.port, 9100);
    assert_eq!(config.session.max_sessions, 3);
    assert_eq!(config.timeouts.embedding_seconds, 5);
}

#[test]
#[serial]
fn invalid_env_values_are_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("ASKDOC_LLM_PROVIDER", "claude");
        std::env::set_var("ASKDOC_RAG_CHUNK_SIZE", "lots");
    }
    let config = Config::load(Path::new("/nonexistent")).unwrap();
    clear_env();
    assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    assert_eq!(config.rag.chunk_size, 1000);
}

#[test]
#[serial]
fn cors_origins_from_env() {
    clear_env();
    unsafe { std::env::set_var("ASKDOC_GATEWAY_CORS_ORIGINS", "https://a.test, ,https://b.test") };
    let config = Config::load(Path::new("/nonexistent")).unwrap();
    clear_env();
    assert_eq!(config.gateway.cors_origins, vec!["https://a.test", "https://b.test"]);
}

#[test]
#[serial]
fn api_key_prefers_prefixed_var() {
    clear_env();
    unsafe {
        std::env::set_var("OPENAI_API_KEY", "sk-plain");
        std::env::set_var("ASKDOC_OPENAI_API_KEY", "sk-prefixed");
    }
    let config = Config::load(Path::new("/nonexistent")).unwrap();
    clear_env();
    assert_eq!(
        config.secrets.openai_api_key.as_ref().map(crate::secret::Secret::expose),
        Some("sk-prefixed")
    );
}

#[test]
#[serial]
fn api_key_falls_back_to_standard_var() {
    clear_env();
    unsafe { std::env::set_var("OPENAI_API_KEY", "sk-plain") };
    let config = Config::load(Path::new("/nonexistent")).unwrap();
    clear_env();
    let key = config.secrets.openai_api_key.unwrap();
    assert_eq!(key.expose(), "sk-plain");
    assert_eq!(format!("{key:?}"), "[REDACTED]");
}

#[test]
#[serial]
fn blank_api_key_is_ignored() {
    clear_env();
    unsafe { std::env::set_var("ASKDOC_OPENAI_API_KEY", "  ") };
    let config = Config::load(Path::new("/nonexistent")).unwrap();
    clear_env();
    assert!(config.secrets.openai_api_key.is_none());
}

#[test]
fn validate_rejects_overlap_not_below_size() {
    let mut config = Config::default();
    config.rag.chunk_overlap = config.rag.chunk_size;
    let err = config.validate().unwrap_err();
    assert!(format!("{err:#}").contains("chunk_overlap"));
}

#[test]
fn validate_rejects_zero_chunk_size() {
    let mut config = Config::default();
    config.rag.chunk_size = 0;
    config.rag.chunk_overlap = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_top_k() {
    let mut config = Config::default();
    config.rag.top_k = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_batch() {
    let mut config = Config::default();
    config.rag.embed_batch_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_sweep_with_ttl() {
    let mut config = Config::default();
    config.session.sweep_interval_secs = 0;
    assert!(config.validate().is_err());
    config.session.idle_ttl_secs = 0;
    assert!(config.validate().is_ok());
}

#[test]
fn provider_kind_display() {
    assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    assert_eq!(ProviderKind::Ollama.to_string(), "ollama");
}

#[test]
fn serialize_round_trip_keeps_sections() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).unwrap();
    assert!(toml_str.contains("[rag]"));
    assert!(toml_str.contains("[gateway]"));
    assert!(!toml_str.contains("secrets"));
}
