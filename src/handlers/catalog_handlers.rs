//! HTTP handlers for the device / operation / image catalog.
//!
//! Every store failure collapses to a 500 with a fixed, route-specific
//! message. The underlying error is only logged.

use crate::{
    errors::AppError,
    models::catalog::ImagePair,
    services::{catalog_service::CatalogService, object_store::StoreError},
};
use axum::{
    Json,
    extract::{Path, State},
};
use tracing::error;

fn upstream_failure(
    context: &'static str,
    message: &'static str,
) -> impl FnOnce(StoreError) -> AppError {
    move |err| {
        error!(error = %err, "Error fetching {}", context);
        AppError::internal(message)
    }
}

/// `GET /api/devices`
pub async fn list_devices(
    State(catalog): State<CatalogService>,
) -> Result<Json<Vec<String>>, AppError> {
    let devices = catalog
        .list_devices()
        .await
        .map_err(upstream_failure("devices", "Failed to fetch devices"))?;
    Ok(Json(devices))
}

/// `GET /api/devices/{device_id}/operations`
pub async fn list_operations(
    State(catalog): State<CatalogService>,
    Path(device_id): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let operations = catalog
        .list_operations(&device_id)
        .await
        .map_err(upstream_failure("operations", "Failed to fetch operations"))?;
    Ok(Json(operations))
}

/// `GET /api/devices/{device_id}/{operation_id}/images`
pub async fn get_images(
    State(catalog): State<CatalogService>,
    Path((device_id, operation_id)): Path<(String, String)>,
) -> Result<Json<ImagePair>, AppError> {
    let images = catalog
        .get_images(&device_id, &operation_id)
        .await
        .map_err(upstream_failure("images", "Failed to fetch images"))?;
    Ok(Json(images))
}
