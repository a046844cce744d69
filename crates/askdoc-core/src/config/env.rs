use super::Config;
use crate::secret::Secret;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_rag();
        self.apply_env_overrides_gateway();
        self.resolve_secrets();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("ASKDOC_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid ASKDOC_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("ASKDOC_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("ASKDOC_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("ASKDOC_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("ASKDOC_LLM_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = n;
        }
        if let Ok(v) = std::env::var("ASKDOC_TIMEOUT_LLM")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.llm_seconds = secs;
        }
        if let Ok(v) = std::env::var("ASKDOC_TIMEOUT_EMBEDDING")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.embedding_seconds = secs;
        }
    }

    fn apply_env_overrides_rag(&mut self) {
        if let Ok(v) = std::env::var("ASKDOC_RAG_CHUNK_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.rag.chunk_size = n;
        }
        if let Ok(v) = std::env::var("ASKDOC_RAG_CHUNK_OVERLAP")
            && let Ok(n) = v.parse::<usize>()
        {
            self.rag.chunk_overlap = n;
        }
        if let Ok(v) = std::env::var("ASKDOC_RAG_TOP_K")
            && let Ok(n) = v.parse::<usize>()
        {
            self.rag.top_k = n;
        }
        if let Ok(v) = std::env::var("ASKDOC_RAG_EMBED_BATCH_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.rag.embed_batch_size = n;
        }
        if let Ok(v) = std::env::var("ASKDOC_SESSION_IDLE_TTL")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.session.idle_ttl_secs = secs;
        }
        if let Ok(v) = std::env::var("ASKDOC_SESSION_SWEEP_INTERVAL")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.session.sweep_interval_secs = secs;
        }
        if let Ok(v) = std::env::var("ASKDOC_SESSION_MAX")
            && let Ok(n) = v.parse::<usize>()
        {
            self.session.max_sessions = n;
        }
    }

    fn apply_env_overrides_gateway(&mut self) {
        if let Ok(v) = std::env::var("ASKDOC_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("ASKDOC_GATEWAY_PORT")
            && let Ok(port) = v.parse::<u16>()
        {
            self.gateway.port = port;
        }
        if let Ok(v) = std::env::var("ASKDOC_GATEWAY_MAX_BODY_SIZE")
            && let Ok(bytes) = v.parse::<usize>()
        {
            self.gateway.max_body_size = bytes;
        }
        if let Ok(v) = std::env::var("ASKDOC_GATEWAY_CORS_ORIGINS") {
            self.gateway.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    fn resolve_secrets(&mut self) {
        let key = std::env::var("ASKDOC_OPENAI_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Some(key) = key {
            self.secrets.openai_api_key = Some(Secret::new(key));
        }
    }
}
