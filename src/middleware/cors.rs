//! Cross-origin boundary in front of the catalog routes.
//!
//! A request without an `Origin` header, or with one from the configured
//! allow-list, reaches the router. Any other origin is answered with 403
//! before route logic runs. Allowed origins get credentialed CORS headers
//! from tower-http's `CorsLayer`.

use crate::errors::AppError;
use anyhow::{Context, Result, bail};
use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use reqwest::Url;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::warn;

/// Validated set of frontend origins.
#[derive(Clone, Debug)]
pub struct AllowedOrigins(Arc<[HeaderValue]>);

impl AllowedOrigins {
    /// Validate each entry as a bare `http(s)://host[:port]` origin.
    /// A trailing `/` is tolerated and dropped.
    pub fn parse<S: AsRef<str>>(origins: &[S]) -> Result<Self> {
        let parsed = origins
            .iter()
            .map(|raw| parse_origin(raw.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(parsed.into()))
    }

    pub fn permits(&self, origin: &HeaderValue) -> bool {
        self.0.iter().any(|allowed| allowed == origin)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderValue> {
        self.0.iter()
    }
}

fn parse_origin(raw: &str) -> Result<HeaderValue> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).with_context(|| format!("parsing allowed origin `{}`", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("allowed origin `{}` must use http or https", raw);
    }
    let origin = url.origin().ascii_serialization();
    if origin != trimmed {
        bail!(
            "allowed origin `{}` must be scheme://host[:port] without path or query",
            raw
        );
    }
    HeaderValue::from_str(&origin).with_context(|| format!("allowed origin `{}`", raw))
}

/// Wrap `router` with origin rejection (outermost) and CORS headers.
pub fn apply_cors(router: Router, origins: AllowedOrigins) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins.iter().cloned()))
        .allow_methods([Method::GET])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    router
        .layer(cors)
        .layer(middleware::from_fn_with_state(origins, reject_unknown_origin))
}

async fn reject_unknown_origin(
    State(origins): State<AllowedOrigins>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !origins.permits(origin) {
            warn!(?origin, path = %request.uri().path(), "rejected cross-origin request");
            return AppError::forbidden("Not allowed by CORS").into_response();
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_origins() {
        let origins = AllowedOrigins::parse(&[
            "http://localhost:3000",
            "https://frontend.example.com/",
        ])
        .unwrap();

        assert!(origins.permits(&HeaderValue::from_static("http://localhost:3000")));
        assert!(origins.permits(&HeaderValue::from_static("https://frontend.example.com")));
        assert!(!origins.permits(&HeaderValue::from_static("https://evil.example.com")));
        assert!(!origins.permits(&HeaderValue::from_static("http://localhost:3001")));
    }

    #[test]
    fn rejects_paths_and_foreign_schemes() {
        assert!(AllowedOrigins::parse(&["https://frontend.example.com/app"]).is_err());
        assert!(AllowedOrigins::parse(&["ftp://frontend.example.com"]).is_err());
        assert!(AllowedOrigins::parse(&["frontend.example.com"]).is_err());
    }

    #[test]
    fn default_ports_must_be_written_without_port() {
        // the browser never sends `:443` for https
        assert!(AllowedOrigins::parse(&["https://frontend.example.com:443"]).is_err());
        assert!(AllowedOrigins::parse(&["https://frontend.example.com:8443"]).is_ok());
    }
}
