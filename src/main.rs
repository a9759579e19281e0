use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use puka::auth::Authenticator;
use puka::config::{Cli, Config, default_config_dir};
use puka::db::Database;
use puka::handler::AppState;
use puka::resource::BookmarkResource;
use puka::routes::app;
use puka::seed;
use puka::storage::DocumentStore;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("puka.svc starting");

    // With --config, data (the database) lives next to the config file.
    // Without it, settings come from the environment and data from ~/.puka/.
    let (cfg, data_dir) = match args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            let cfg = Config::new(&path.to_string_lossy()).unwrap_or_else(|e| {
                tracing::error!(error = %e, path = ?path, "failed to load config file");
                std::process::exit(1);
            });
            (cfg, dir)
        }
        None => {
            let cfg = Config::from_env().unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to read configuration from environment");
                std::process::exit(1);
            });
            (cfg, default_config_dir())
        }
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(error = %e, dir = ?data_dir, "failed to create data directory");
        std::process::exit(1);
    }

    let db = Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    });
    let store = Arc::new(DocumentStore::new(db));

    if let Some(seed_path) = args.seed_path {
        if let Err(e) = seed::seed(&store, &PathBuf::from(seed_path)).await {
            tracing::error!(error = %e, "failed to seed bookmarks");
            std::process::exit(1);
        }
    }

    let auth = Authenticator::new(cfg.app.get_auth_token().map(str::to_string));
    if !auth.is_enabled() {
        tracing::warn!("no auth token configured, writes are not authenticated");
    }

    let resource = Arc::new(BookmarkResource::new(store.clone(), cfg.app.resource_config()));
    let state = AppState::new(resource, cfg.app.get_base_url());

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    let cancellation_token = CancellationToken::new();
    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
        }
        shutdown_token.cancel();
    });

    tracing::info!(base_url = %cfg.app.get_base_url(), "puka.svc running on {}", &address);
    let server = axum::serve(listener, app(state, auth))
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await });
    if let Err(err) = server.await {
        tracing::error!(error = %err, "server terminated with error");
        store.close();
        std::process::exit(1);
    }

    store.close();
    tracing::info!("puka.svc going off, graceful shutdown complete");
}
