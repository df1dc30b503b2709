//! Transcript Relay - Entry Point
//!
//! Starts the API server with graceful shutdown support.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_relay::api::{ApiServer, AppState};
use transcript_relay::config::{Config, LogConfig};
use transcript_relay::error::{RelayError, Result};
use transcript_relay::proxy::{
    CandidateSource, DirectConnection, HttpListProvider, ProxyProvider, ProxySource,
};
use transcript_relay::transcript::{RetryConfig, TranscriptFetcher, YouTubeTranscriptSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    init_tracing(&config.log);
    info!("Starting Transcript Relay");

    // Build the proxy pool (or go direct)
    let proxy_pool = if config.proxy.enabled {
        let client = reqwest::Client::builder()
            .timeout(config.proxy.provider_timeout)
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let providers: Vec<Arc<dyn ProxyProvider>> = config
            .proxy
            .providers
            .iter()
            .cloned()
            .map(|spec| Arc::new(HttpListProvider::new(client.clone(), spec)) as Arc<dyn ProxyProvider>)
            .collect();
        info!("Proxy rotation enabled with {} providers", providers.len());

        Some(Arc::new(ProxySource::new(
            providers,
            config.proxy.provider_timeout,
        )))
    } else {
        info!("Proxy rotation disabled, connecting directly");
        None
    };

    // Warm the pool in the background; draws refresh lazily anyway
    if let Some(pool) = proxy_pool.clone() {
        tokio::spawn(async move {
            pool.refresh().await;
        });
    }

    let candidates: Arc<dyn CandidateSource> = match &proxy_pool {
        Some(pool) => pool.clone() as Arc<dyn CandidateSource>,
        None => Arc::new(DirectConnection),
    };

    let fetcher = Arc::new(TranscriptFetcher::new(
        candidates,
        Arc::new(YouTubeTranscriptSource::new(config.fetch.attempt_timeout)),
        RetryConfig {
            max_attempts: config.fetch.max_attempts,
            attempt_timeout: config.fetch.attempt_timeout,
        },
    ));

    let state = AppState::new(fetcher, proxy_pool, &config.fetch.default_language);
    let api_server = ApiServer::new(config.api.clone(), state);

    // Create shutdown channel
    let (shutdown_tx, _) = watch::channel(false);
    let api_shutdown = shutdown_tx.subscribe();

    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run(api_shutdown).await {
            error!("API server error: {}", e);
        }
    });

    info!("Server started on {}", config.api_addr());

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    let _ = api_task.await;

    info!("Transcript Relay stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `LOG_LEVEL`.
fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("transcript_relay={},tower_http=info", log.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if log.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
