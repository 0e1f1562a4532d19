use std::sync::Arc;

use clap::Parser;
use mirror_engine::{
    CacheStore, DomainsClient, DownloadService, GithubReleaseSource, NotificationIngester,
    RefreshCoordinator, RefreshTrigger, VersionState, create_client,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod config;
mod error;

use api::AppState;
use cli::CliArgs;
use config::AppConfig;
use error::AppError;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

fn init_logging(args: &CliArgs) -> Result<(), AppError> {
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if args.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| AppError::Initialization(e.to_string()))
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();
    init_logging(&args)?;

    let config = AppConfig::load(&args.config)?;
    let mirror_config = config.mirror_config();
    info!(
        config = %args.config.display(),
        repo = %mirror_config.repo,
        cache_dir = %mirror_config.cache_root.display(),
        interval_secs = config.refresh.interval_secs,
        webhook_signed = config.webhook_secret().is_some(),
        "Configuration loaded"
    );

    let client = create_client(&mirror_config)?;

    let store = Arc::new(CacheStore::new(client.clone(), &mirror_config));
    store.init().await.map_err(|e| {
        AppError::Initialization(format!(
            "failed to create cache directory {}: {e}",
            store.root().display()
        ))
    })?;

    let source = Arc::new(GithubReleaseSource::new(client.clone(), &mirror_config));
    let versions = Arc::new(VersionState::new(source));

    let (coordinator, worker) =
        RefreshCoordinator::spawn(versions.clone(), store.clone(), config.release_token());
    coordinator.trigger(RefreshTrigger::Startup);
    let timer = coordinator.spawn_interval(config.refresh.interval());

    let state = AppState {
        versions: versions.clone(),
        downloads: DownloadService::new(versions, store, config.release_token()),
        ingester: Arc::new(NotificationIngester::new(
            config.webhook_secret(),
            coordinator,
        )),
        domains: DomainsClient::new(
            client,
            &config.release.api_url,
            config.domains.repo.trim(),
            config.domains_token(),
            mirror_config.metadata_timeout,
        ),
        base_url: Arc::from(config.base_url()),
    };
    if state.base_url.is_empty() {
        warn!("server.base_url is empty, download links will be relative");
    }

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Initialization(format!("failed to bind {addr}: {e}")))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    timer.abort();
    worker.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
