mod cli;

use crate::cli::{CacheBackendArg, GeneratorArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use portal_cache::{
    CacheSettings, LinkCache, MokaLinkCache, RedisLinkCache, RedisSequence, ResolutionCache,
};
use portal_core::{ClickRepository, Dispatcher, DispatcherConfig, LinkRepository, SequenceSource};
use portal_gateway::sweeper::spawn_sweeper;
use portal_gateway::telemetry::init_tracing;
use portal_gateway::{App, AppState};
use portal_generator::{build_generator, GeneratorSettings};
use portal_redirector::{ClickRecorder, ResolutionService};
use portal_shortener::{CodeGenerator, LinkService, UrlPolicy};
use portal_storage::{InMemoryRepository, MySqlRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Upper bound on waiting for detached click accounting at shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format)?;

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        generator = %config.generator,
        node_id = config.node_id,
        "starting portal"
    );

    let (links, clicks) = open_store(&config).await?;
    let cache = ResolutionCache::new(
        open_cache(&config).await?,
        CacheSettings::builder()
            .url_ttl(Duration::from_secs(config.url_ttl_secs))
            .op_timeout(Duration::from_millis(config.cache_timeout_ms))
            .build(),
    );

    let generator = match config.generator {
        GeneratorArg::Snowflake => {
            build_generator(&GeneratorSettings::snowflake(config.node_id), None)?
        }
        GeneratorArg::Sequence => {
            build_generator(&GeneratorSettings::Sequence, open_sequence(&config).await?)?
        }
    };
    let codes = CodeGenerator::new(generator, links.clone());

    let link_service = LinkService::new(
        links.clone(),
        clicks.clone(),
        codes,
        cache.clone(),
        UrlPolicy::default(),
    );

    let dispatcher = Dispatcher::new(DispatcherConfig {
        max_concurrency: config.dispatch_concurrency,
        max_queued: config.dispatch_queue,
        deadline: Duration::from_millis(config.dispatch_deadline_ms),
    });
    let recorder = ClickRecorder::new(links.clone(), clicks, cache.clone());
    let resolver = ResolutionService::new(links, cache, recorder, dispatcher.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_sweeper(
        link_service.clone(),
        Duration::from_secs(config.sweep_interval_secs.max(1)),
        shutdown_rx,
    );

    let state = AppState::new(link_service, Arc::new(resolver), config.public_base_url);
    let app = App::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        warn!(error = %e, "expiry sweeper ended abnormally");
    }

    info!(in_flight = dispatcher.in_flight(), "draining background tasks");
    if !dispatcher.drain_timeout(DRAIN_TIMEOUT).await {
        warn!(
            in_flight = dispatcher.in_flight(),
            "background tasks still running at shutdown"
        );
    }
    info!("portal stopped");
    Ok(())
}

async fn open_store(
    config: &CLI,
) -> anyhow::Result<(Arc<dyn LinkRepository>, Arc<dyn ClickRepository>)> {
    match config.storage {
        StorageBackendArg::InMemory => {
            let repository = Arc::new(InMemoryRepository::new());
            Ok((repository.clone(), repository))
        }
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(dsn).await?;
            repository.ensure_schema().await?;
            let repository = Arc::new(repository);
            Ok((repository.clone(), repository))
        }
    }
}

async fn open_cache(config: &CLI) -> anyhow::Result<Arc<dyn LinkCache>> {
    match config.cache {
        CacheBackendArg::InMemory => Ok(Arc::new(MokaLinkCache::new())),
        CacheBackendArg::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("redis url is required when cache backend is redis")?;
            Ok(Arc::new(
                RedisLinkCache::connect(url, config.cache_prefix.clone()).await?,
            ))
        }
    }
}

/// The shared counter when Redis is configured. Without it the generator
/// falls back to a process-local counter.
async fn open_sequence(config: &CLI) -> anyhow::Result<Option<Arc<dyn SequenceSource>>> {
    let Some(url) = config.redis_url.as_deref() else {
        warn!("no redis url configured, sequence ids are only unique within this process");
        return Ok(None);
    };
    let client = redis::Client::open(url)?;
    let conn = client.get_multiplexed_async_connection().await?;
    Ok(Some(Arc::new(RedisSequence::new(
        conn,
        config.sequence_key.clone(),
    ))))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
