use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use regsync::config::AppConfig;
use regsync::platform::LmsClient;
use regsync::registry::{RegistryClient, ResolveCache};
use regsync::server::create_router;
use regsync::sync::{sync_queue, SyncContext};
use regsync::types::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let platform_base =
        Url::parse(&config.platform.base_url).context("parsing the platform base URL")?;

    let platform = Arc::new(LmsClient::new(&config.platform)?);
    let registry = Arc::new(RegistryClient::new(&config.registry)?);

    let ctx = Arc::new(SyncContext {
        registry: registry.clone(),
        platform: platform.clone(),
        platform_base: platform_base.clone(),
        resolve_cache: ResolveCache::new(Duration::from_secs(
            config.sync.resolve_cache_ttl_secs,
        )),
    });
    let (dispatcher, worker) = sync_queue(config.sync.queue_capacity, ctx);
    tokio::spawn(worker.run());
    info!("sync worker started");

    let state = Arc::new(AppState {
        registry,
        platform,
        platform_base,
        dispatcher,
        config,
    });

    let bind_addr = state.config.server.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!("listening on http://{bind_addr}");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
