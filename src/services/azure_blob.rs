//! src/services/azure_blob.rs
//!
//! AzureBlobStore — `ObjectStore` over the Blob service REST API. Listing
//! uses `List Blobs` authorised by a short-lived container SAS signed with
//! the same account key that signs the per-blob read URLs, so only one
//! signing scheme exists in the crate.

use super::{
    object_store::{ObjectStore, SasPermissions, StoreError, StoreResult},
    sas::{SasResource, ServiceSas, SharedKeyCredential},
};
use chrono::{DateTime, Duration, Utc};
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

/// Lifetime of the SAS minted for each listing page request.
const LIST_SAS_TTL_MINUTES: i64 = 15;

/// Shared, immutable handle to one storage account.
#[derive(Clone, Debug)]
pub struct AzureBlobStore {
    http: Client,
    credential: SharedKeyCredential,
    endpoint: Url,
}

/// One page of `List Blobs` output.
#[derive(Debug, Default, PartialEq, Eq)]
struct BlobPage {
    names: Vec<String>,
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
    #[serde(default)]
    blobs: BlobList,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobList {
    #[serde(rename = "Blob", default)]
    items: Vec<BlobItem>,
}

#[derive(Debug, Deserialize)]
struct BlobItem {
    #[serde(rename = "Name")]
    name: String,
}

impl AzureBlobStore {
    /// Build a store for `credential`'s account. `endpoint` overrides the
    /// public `https://<account>.blob.core.windows.net` address, e.g. for a
    /// local storage emulator.
    pub fn new(credential: SharedKeyCredential, endpoint: Option<&str>) -> StoreResult<Self> {
        let raw = match endpoint {
            Some(endpoint) => endpoint.to_string(),
            None => format!("https://{}.blob.core.windows.net", credential.account_name()),
        };
        let endpoint = Url::parse(&raw).map_err(|_| StoreError::InvalidEndpoint(raw.clone()))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::InvalidEndpoint(raw));
        }

        Ok(Self {
            http: Client::new(),
            credential,
            endpoint,
        })
    }

    /// `<endpoint>/<container>[/<key segments>]`, each segment percent-encoded.
    fn resource_url(&self, container: &str, key: Option<&str>) -> StoreResult<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidEndpoint(self.endpoint.to_string()))?;
            segments.pop_if_empty().push(container);
            if let Some(key) = key {
                segments.extend(key.split('/'));
            }
        }
        Ok(url)
    }

    /// Fetch a single `List Blobs` page starting at `marker`.
    async fn fetch_page(
        &self,
        container: &str,
        prefix: Option<&str>,
        marker: Option<&str>,
    ) -> StoreResult<BlobPage> {
        let sas = ServiceSas {
            container,
            resource: SasResource::Container,
            permissions: SasPermissions::LIST,
            starts_on: None,
            expires_on: Utc::now() + Duration::minutes(LIST_SAS_TTL_MINUTES),
        };

        let mut url = self.resource_url(container, None)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("restype", "container");
            query.append_pair("comp", "list");
            if let Some(prefix) = prefix {
                query.append_pair("prefix", prefix);
            }
            if let Some(marker) = marker {
                query.append_pair("marker", marker);
            }
            query.extend_pairs(sas.query_pairs(&self.credential)?);
        }

        debug!(container, ?prefix, ?marker, "listing blobs");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Status { status, body });
        }

        parse_list_blobs(&body)
    }
}

impl ObjectStore for AzureBlobStore {
    fn list_keys<'a>(
        &'a self,
        container: &'a str,
        prefix: Option<&'a str>,
    ) -> BoxStream<'a, StoreResult<String>> {
        // Some(marker) = a page still to fetch (None marker = first page);
        // outer None = listing exhausted.
        let pages = futures::stream::try_unfold(Some(None::<String>), move |state| async move {
            let Some(marker) = state else {
                return Ok(None);
            };
            let page = self.fetch_page(container, prefix, marker.as_deref()).await?;
            let next = page.next_marker.map(Some);
            Ok::<_, StoreError>(Some((page.names, next)))
        });

        pages
            .map_ok(|names| futures::stream::iter(names.into_iter().map(Ok::<_, StoreError>)))
            .try_flatten()
            .boxed()
    }

    fn sign_url(
        &self,
        container: &str,
        key: &str,
        permissions: SasPermissions,
        starts_on: DateTime<Utc>,
        expires_on: DateTime<Utc>,
    ) -> StoreResult<String> {
        let sas = ServiceSas {
            container,
            resource: SasResource::Blob(key),
            permissions,
            starts_on: Some(starts_on),
            expires_on,
        };

        let mut url = self.resource_url(container, Some(key))?;
        url.query_pairs_mut()
            .extend_pairs(sas.query_pairs(&self.credential)?);
        Ok(url.into())
    }
}

fn parse_list_blobs(xml: &str) -> StoreResult<BlobPage> {
    let results: EnumerationResults = quick_xml::de::from_str(xml)?;
    Ok(BlobPage {
        names: results.blobs.items.into_iter().map(|b| b.name).collect(),
        next_marker: results.next_marker.filter(|m| !m.is_empty()),
    })
}
