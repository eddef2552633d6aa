use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::info;

use crate::app::api;
use crate::app::config::ServeConfig;
use crate::app::storage::Storage;

// API routes first, anything else is looked up in the public directory
pub fn app(storage: Storage, public_dir: &Path) -> Router {
    api::router(Arc::new(storage)).fallback_service(ServeDir::new(public_dir))
}

pub async fn serve(config: ServeConfig) -> Result<()> {
    let storage = config
        .open_storage()
        .with_context(|| format!("cannot open task store {}", config.tasks_file.display()))?;

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;

    info!(
        backend = ?config.backend,
        tasks_file = %config.tasks_file.display(),
        id_policy = ?config.id_policy,
        serialized = !config.unserialized,
        "Checklist app running at http://localhost:{}",
        config.port
    );
    info!("Press Ctrl+C to stop the server");

    axum::serve(listener, app(storage, &config.public_dir))
        .await
        .context("server terminated with error")
}
