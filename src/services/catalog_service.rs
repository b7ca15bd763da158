//! src/services/catalog_service.rs
//!
//! CatalogService — derives devices, operations and before/after image URLs
//! from the keys of one container. Holds no state besides the shared store
//! handle, so a clone is handed to every request.

use crate::{
    models::catalog::{
        ImagePair, ImageRole, device_of, device_prefix, operation_of, operation_prefix,
    },
    services::object_store::{ObjectStore, SasPermissions, StoreResult},
};
use chrono::{DateTime, Duration, Utc};
use futures::TryStreamExt;
use std::{collections::BTreeSet, sync::Arc};
use tracing::debug;

/// Validity window of every image URL handed to clients.
pub const SIGNED_URL_TTL_HOURS: i64 = 48;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ObjectStore>,
    container: Arc<str>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ObjectStore>, container: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Distinct first segments of every key in the container, sorted.
    pub async fn list_devices(&self) -> StoreResult<Vec<String>> {
        let mut devices = BTreeSet::new();
        let mut keys = self.store.list_keys(&self.container, None);
        while let Some(key) = keys.try_next().await? {
            if let Some(device) = device_of(&key) {
                devices.insert(device.to_string());
            }
        }
        Ok(devices.into_iter().collect())
    }

    /// Distinct operation segments under `device_id`, sorted. An unknown
    /// device yields an empty list.
    pub async fn list_operations(&self, device_id: &str) -> StoreResult<Vec<String>> {
        let prefix = device_prefix(device_id);
        let mut operations = BTreeSet::new();
        let mut keys = self.store.list_keys(&self.container, Some(&prefix));
        while let Some(key) = keys.try_next().await? {
            if let Some(operation) = operation_of(&key, &prefix) {
                operations.insert(operation.to_string());
            }
        }
        Ok(operations.into_iter().collect())
    }

    /// Signed read URLs for the before/after images of one operation.
    ///
    /// Each key whose file-name part (everything after `device/operation/`)
    /// contains a role token is signed once and assigned to every role it
    /// matches. Later keys in listing order overwrite earlier ones.
    pub async fn get_images(
        &self,
        device_id: &str,
        operation_id: &str,
    ) -> StoreResult<ImagePair> {
        let prefix = operation_prefix(device_id, operation_id);
        let starts_on = whole_second(Utc::now());
        let expires_on = starts_on + Duration::hours(SIGNED_URL_TTL_HOURS);

        debug!(%prefix, "checking prefix for images");

        let mut images = ImagePair::default();
        let mut keys = self.store.list_keys(&self.container, Some(&prefix));
        while let Some(key) = keys.try_next().await? {
            let file_name = key.strip_prefix(prefix.as_str()).unwrap_or(&key);
            let roles = ImageRole::classify(file_name);
            if roles.is_empty() {
                continue;
            }

            let url = self.store.sign_url(
                &self.container,
                &key,
                SasPermissions::READ,
                starts_on,
                expires_on,
            )?;
            for role in roles {
                images.set(role, url.clone());
            }
        }
        Ok(images)
    }

    /// Pull at most one key to confirm the container is reachable.
    pub async fn check_store(&self) -> StoreResult<()> {
        let mut keys = self.store.list_keys(&self.container, None);
        keys.try_next().await?;
        Ok(())
    }
}

/// Drop the sub-second part; SAS timestamps only carry whole seconds.
fn whole_second(at: DateTime<Utc>) -> DateTime<Utc> {
    at - Duration::nanoseconds(i64::from(at.timestamp_subsec_nanos()))
}
