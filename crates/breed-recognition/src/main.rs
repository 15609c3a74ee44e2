mod assembler;
mod cache;
mod catalog;
mod config;
mod error;
mod http;
mod model;
mod parser;
mod prompt;
mod rate_limit;
mod recognizer;
mod resolver;
mod server;

use std::path::Path;
use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use breed_common::redis::RedisCache;
use breed_common::vision::{Classifier, VisionClient};

use cache::RecognitionCache;
use catalog::Catalog;
use config::Config;
use rate_limit::RateLimiter;
use recognizer::Recognizer;
use server::BreedRecognitionServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stderr only: stdout carries MCP JSON-RPC in stdio mode
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting breed-recognition service");

    let config = Config::from_env()?;
    info!(
        listen_addr = %config.listen_addr,
        mcp_stdio = config.mcp_stdio,
        redis = config.redis_url.is_some(),
        rate_limit_rps = config.rate_limit_rps,
        "configuration loaded"
    );

    let catalog = match config.catalog_path.as_deref() {
        Some(path) => Catalog::from_file(Path::new(path))?,
        None => Catalog::indian_breeds(),
    };
    info!(breeds = catalog.len(), "breed catalog loaded");

    info!(
        base_url = %config.vision.base_url,
        model = %config.vision.model,
        timeout_ms = config.vision.timeout.as_millis(),
        max_retries = config.vision.max_retries,
        "classifier client configured"
    );
    let classifier = VisionClient::new(config.vision.clone())?;
    if !classifier.is_configured() {
        tracing::warn!("no classifier API key set; recognition requests will fail");
    }

    let redis_cache = RedisCache::new(config.redis_url.as_deref());
    if redis_cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without result cache");
    }
    let cache = RecognitionCache::new(redis_cache, config.cache_ttl_secs);
    let limiter = RateLimiter::new(config.rate_limit_rps);

    let recognizer = Arc::new(Recognizer::new(Arc::new(catalog), classifier, cache, limiter));

    if config.mcp_stdio {
        let server = BreedRecognitionServer::new(recognizer);
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
        return Ok(());
    }

    let app = http::router(recognizer, &config.cors_origins);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
