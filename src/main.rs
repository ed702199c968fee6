use anyhow::{Context, Result};
use edu_portal::{
    build_app,
    config::{AppConfig, StorageBackend, StorageConfig},
    db,
    services::{memory_store::MemoryObjectStore, object_store::ObjectStore, r2_store::R2ObjectStore},
    state::AppState,
};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;
    tracing::info!("Starting edu-portal with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    tracing::debug!("Connecting using raw URL => {}", cfg.database_url);
    let db = Arc::new(db::connect(&cfg.database_url).await?);

    // --- Handle migration mode ---
    db::run_migrations(&db).await?;
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Object store ---
    let store: Arc<dyn ObjectStore> = match cfg.storage {
        StorageBackend::R2 => {
            let storage_cfg = StorageConfig::from_env()?;
            tracing::info!("Using R2 object store: {:?}", storage_cfg);
            Arc::new(R2ObjectStore::new(&storage_cfg).context("configuring R2 object store")?)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object store; uploads are lost on restart");
            Arc::new(MemoryObjectStore::new(format!(
                "http://{}/objects",
                cfg.addr()
            )))
        }
    };

    // --- Build router ---
    let app = build_app(AppState::new(db, store), cfg.max_upload_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
