use anyhow::{Context, Result};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

use middleware::cors::AllowedOrigins;
use services::{
    azure_blob::AzureBlobStore, catalog_service::CatalogService, sas::SharedKeyCredential,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- .env (optional) ---
    let dotenv = dotenvy::dotenv();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = &dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;
    tracing::info!("Starting blob-catalog with config: {:?}", cfg);

    // --- Validate origins before anything listens ---
    let origins = AllowedOrigins::parse(&cfg.allowed_origins)?;

    // --- Initialize store + catalog ---
    let credential = SharedKeyCredential::new(cfg.account_name.clone(), &cfg.account_key)
        .context("AZURE_STORAGE_ACCOUNT_KEY")?;
    let store = AzureBlobStore::new(credential, cfg.blob_endpoint.as_deref())?;
    let catalog = CatalogService::new(Arc::new(store), cfg.container.clone());

    // --- Build router ---
    let app = routes::routes::app(catalog, origins);

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
