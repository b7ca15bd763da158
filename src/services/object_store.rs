//! The object store seam: prefix listing and signed read URLs.
//!
//! `CatalogService` only ever talks to a `dyn ObjectStore`, so the catalog
//! rules are testable against the in-memory store in [`memory`].

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("object store returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed listing response: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("account key is not valid base64")]
    InvalidAccountKey,
    #[error("invalid blob endpoint `{0}`")]
    InvalidEndpoint(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Permission set granted by a signed URL.
///
/// Letters are emitted in the canonical order the store expects (`r` before
/// `l`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SasPermissions {
    pub read: bool,
    pub list: bool,
}

impl SasPermissions {
    pub const READ: Self = Self {
        read: true,
        list: false,
    };
    pub const LIST: Self = Self {
        read: false,
        list: true,
    };

    pub fn as_sas_str(&self) -> String {
        let mut out = String::new();
        if self.read {
            out.push('r');
        }
        if self.list {
            out.push('l');
        }
        out
    }
}

/// Listing and signing over a set of containers.
///
/// Implementations hold only immutable, shareable state; handlers call into
/// one instance concurrently.
pub trait ObjectStore: Send + Sync {
    /// Lazily enumerate keys in `container`, optionally restricted to those
    /// starting with `prefix`. Order is whatever the store lists natively.
    fn list_keys<'a>(
        &'a self,
        container: &'a str,
        prefix: Option<&'a str>,
    ) -> BoxStream<'a, StoreResult<String>>;

    /// Produce a URL granting `permissions` on exactly one object between
    /// `starts_on` and `expires_on`.
    fn sign_url(
        &self,
        container: &str,
        key: &str,
        permissions: SasPermissions,
        starts_on: DateTime<Utc>,
        expires_on: DateTime<Utc>,
    ) -> StoreResult<String>;
}
