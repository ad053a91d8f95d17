use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_dataset, get_dataset, get_series, health_check, list_datasets, metric, summary,
    upload, AppState, DetectionDefaults,
};
use crate::storage::{DatasetStore, FileStore, InMemoryStore};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Persist datasets as JSON documents here; in-memory when unset
    pub data_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub detection: DetectionDefaults,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            data_dir: None,
            max_upload_bytes: 64 * 1024 * 1024, // 64MB
            detection: DetectionDefaults::default(),
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Ingest
        .route("/upload", post(upload))
        // Datasets
        .route("/datasets", get(list_datasets))
        .route("/datasets/:id", get(get_dataset).delete(delete_dataset))
        .route("/datasets/:id/series", get(get_series))
        // Metrics
        .route("/datasets/:id/metrics/:metric", get(metric))
        .route("/datasets/:id/summary", get(summary))
        // Middleware
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn DatasetStore> = match &config.data_dir {
        Some(dir) => {
            tracing::info!("Persisting datasets under {}", dir.display());
            Arc::new(FileStore::new(dir)?)
        }
        None => {
            tracing::info!("Keeping datasets in memory");
            Arc::new(InMemoryStore::new())
        }
    };

    let state = Arc::new(AppState {
        store,
        detection: config.detection,
    });

    let app = build_router(state, config.max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting hotfire server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("hotfire server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
