use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{alerts, autocomplete, get_instance, health_check, list_instances, AppState};
use crate::config::Settings;
use crate::poller::{AlertStore, PullWorker};
use crate::upstream::{InstanceConnector, Registry};

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Alert data
        .route("/alerts.json", post(alerts))
        .route("/autocomplete.json", get(autocomplete))
        // Backend instances
        .route("/instances", get(list_instances))
        .route("/instances/:name", get(get_instance))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Register every configured instance; a duplicate name is fatal
pub fn build_registry(settings: &Settings) -> Result<Registry, Box<dyn std::error::Error>> {
    let registry = Registry::new();
    let patterns = settings.ticket_patterns();

    for instance in &settings.instances {
        let connector =
            InstanceConnector::from_config(instance)?.with_ticket_patterns(patterns.clone());
        registry.register(connector)?;
    }

    Ok(registry)
}

/// Run the HTTP server
pub async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(build_registry(&settings)?);
    let store = Arc::new(AlertStore::new());

    let state = Arc::new(AppState::new(Arc::clone(&registry), Arc::clone(&store)));

    // Start background pulls
    let worker = Arc::new(PullWorker::new(
        registry,
        store,
        settings.dedup.clone(),
        settings.colors.clone(),
        settings.pull_interval,
    ));
    let worker_handle = Arc::clone(&worker).start();

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    tracing::info!("Starting alertdeck server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&worker)))
        .await?;

    worker_handle.abort();

    tracing::info!("alertdeck server stopped");
    Ok(())
}

async fn shutdown_signal(worker: Arc<PullWorker>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    tracing::info!("Shutdown signal received, stopping pull worker...");
    worker.stop();
}
