//! Folio auth server
//!
//! Serves password login, token refresh and wallet linking for Folio users
//! and creators.

use axum::http::{header, HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};

use folio_auth::app_state::AppState;
use folio_auth::config::Config;
use folio_auth::store::PgStore;
use folio_auth::wallet::{LabelResolver, NameServiceResolver, NoLabelResolver, WalletEvents};
use folio_auth::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting Folio auth server");

    let store = PgStore::connect(&config).await?;
    store.migrate().await?;
    let store = Arc::new(store);

    let labels: Arc<dyn LabelResolver> = match &config.name_service_url {
        Some(url) => {
            tracing::info!(url = %url, "Wallet labels resolved through name service");
            Arc::new(NameServiceResolver::new(
                url.clone(),
                Duration::from_millis(config.name_service_timeout_ms),
            )?)
        }
        None => {
            tracing::info!("NAME_SERVICE_URL not set, wallet labels disabled");
            Arc::new(NoLabelResolver)
        }
    };

    let app_state = AppState::new(
        store.clone(),
        store.clone(),
        labels,
        config.token_config(),
        config.sign_message_prefix.clone(),
    )
    .with_database(store);

    spawn_wallet_event_log(app_state.wallet_linker.events());

    let app = routes::app_router(app_state).layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Downstream consumers hook in here; for now events are only logged
fn spawn_wallet_event_log(events: &WalletEvents) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    tracing::debug!(event = ?event, "Wallet event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Wallet event log lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn configure_cors(config: &Config) -> CorsLayer {
    let Some(allowed_origins) = &config.cors_allowed_origins else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
