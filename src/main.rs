mod cache;
mod config;
mod curator;
mod enrich;
mod error;
mod extractor;
mod fetcher;
mod routes;
mod selector;

use std::path::Path;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::CacheGateway;
use crate::config::Config;
use crate::curator::{AnthropicClient, Curator};
use crate::fetcher::FeedFetcher;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dinner_news=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = Config::from_env();
    if Path::new("feeds.toml").exists() {
        config.load_feeds("feeds.toml")?;
    }
    info!("Loaded {} feed sources", config.feeds.len());

    if config.generation.is_none() {
        warn!("ANTHROPIC_AUTH_TOKEN is not set; /curate-news will return a configuration error");
    }
    if config.kv.is_none() {
        info!("Cache store unconfigured; caching disabled");
    }

    let curator = config
        .generation
        .as_ref()
        .map(|gen| Curator::new(Arc::new(AnthropicClient::new(gen))));

    let state = Arc::new(AppState {
        fetcher: FeedFetcher::new(config.feeds.clone()),
        curator,
        cache: CacheGateway::new(config.kv.as_ref()),
    });

    // Build router
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Server starting on http://localhost:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
