use std::sync::Arc;

use anyhow::{Context, Result};

use chainstatus_api::{register_indexing_status_cache, serve, AppState};
use chainstatus_cache::CacheRegistry;
use chainstatus_observability::init_tracing;
use chainstatus_runtime::{HttpIndexingRuntime, IndexingStatusBuilder};

use crate::config::ServerConfig;

pub async fn run(config: ServerConfig) -> Result<()> {
    init_tracing(&config.log).context("initialising logging")?;

    let runtime = HttpIndexingRuntime::new(config.runtime_config())
        .context("creating indexing runtime client")?;
    tracing::info!(
        runtime_url = %config.runtime.url,
        namespace = %config.namespace,
        plugins = ?config.plugins,
        "starting chainstatus"
    );

    let registry = Arc::new(CacheRegistry::new());
    register_indexing_status_cache(
        &registry,
        IndexingStatusBuilder::new(Arc::new(runtime)),
        config.cache_config(),
    )
    .context("registering indexing status cache")?;

    let state = AppState::new(registry, config.public_config());
    serve(config.server_settings(), state, shutdown_signal())
        .await
        .context("running http server")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
