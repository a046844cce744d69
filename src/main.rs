use std::sync::Arc;
use std::time::Duration;

use askdoc_core::bootstrap::{create_provider, health_check, resolve_config_path};
use askdoc_core::config::Config;
use askdoc_core::{RagService, RagSettings};
use askdoc_gateway::GatewayServer;
use askdoc_llm::LlmProvider;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let config_path = resolve_config_path();
    let config = Config::load(&config_path)?;
    config.validate()?;

    let provider = create_provider(&config)?;
    health_check(&provider).await;
    tracing::info!(
        provider = provider.name(),
        model = %config.llm.model,
        embedding_model = %config.llm.embedding_model,
        "provider ready"
    );

    let service = Arc::new(RagService::new(provider, RagSettings::from_config(&config))?);

    let sweeper_cancel = CancellationToken::new();
    let sweeper = (config.session.idle_ttl_secs > 0).then(|| {
        service.spawn_eviction(
            Duration::from_secs(config.session.idle_ttl_secs),
            Duration::from_secs(config.session.sweep_interval_secs),
            sweeper_cancel.clone(),
        )
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let server = GatewayServer::new(
        &config.gateway.bind,
        config.gateway.port,
        Arc::clone(&service),
        shutdown_rx,
    )
    .with_max_body_size(config.gateway.max_body_size)
    .with_cors_origins(config.gateway.cors_origins.clone());
    let result = server.serve().await;

    sweeper_cancel.cancel();
    if let Some(handle) = sweeper
        && let Err(e) = handle.await
    {
        tracing::warn!("session sweeper task failed: {e}");
    }
    service.shutdown();

    result?;
    Ok(())
}
