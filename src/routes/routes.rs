//! Defines routes for the device / operation / image catalog.
//!
//! ## Structure
//! - **Catalog endpoints** (read-only, JSON)
//!   - `GET /api/devices` — distinct device identifiers
//!   - `GET /api/devices/{device_id}/operations` — operations of one device
//!   - `GET /api/devices/{device_id}/{operation_id}/images` — signed before/after URLs
//!
//! - **Health**
//!   - `GET /healthz` — liveness
//!   - `GET /readyz` — object store reachability
//!
//! Everything sits behind the origin allow-list from `middleware::cors`.

use crate::{
    handlers::{
        catalog_handlers::{get_images, list_devices, list_operations},
        health_handlers::{healthz, readyz},
    },
    middleware::cors::{AllowedOrigins, apply_cors},
    services::catalog_service::CatalogService,
};
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

/// Build the catalog router. The router carries `CatalogService` as shared
/// state to all handlers.
pub fn routes() -> Router<CatalogService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/devices", get(list_devices))
        .route("/api/devices/{device_id}/operations", get(list_operations))
        .route(
            "/api/devices/{device_id}/{operation_id}/images",
            get(get_images),
        )
}

/// Fully assembled application: routes, state, origin policy and request
/// tracing.
pub fn app(catalog: CatalogService, origins: AllowedOrigins) -> Router {
    let router = routes().with_state(catalog);
    apply_cors(router, origins).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::object_store::memory::MemoryStore;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    const FRONTEND: &str = "http://localhost:3000";

    fn test_app(store: MemoryStore) -> Router {
        let catalog = CatalogService::new(Arc::new(store), "photos");
        app(catalog, AllowedOrigins::parse(&[FRONTEND]).unwrap())
    }

    fn sample() -> MemoryStore {
        MemoryStore::with_keys(["d1/op1/before.png", "d1/op1/after.png", "d1/op2/before.jpg"])
    }

    async fn get(app: Router, uri: &str, origin: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(origin) = origin {
            request = request.header(header::ORIGIN, origin);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn lists_devices_and_operations() {
        let response = get(test_app(sample()), "/api/devices", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!(["d1"]));

        let response = get(test_app(sample()), "/api/devices/d1/operations", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!(["op1", "op2"]));
    }

    #[tokio::test]
    async fn images_report_missing_roles_as_null() {
        let response = get(test_app(sample()), "/api/devices/d1/op2/images", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert!(body["before"].as_str().unwrap().contains("d1/op2/before.jpg"));
        assert_eq!(body["after"], Value::Null);
    }

    #[tokio::test]
    async fn unknown_device_is_empty_not_404() {
        let response = get(test_app(sample()), "/api/devices/ghost/operations", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));

        let response = get(test_app(sample()), "/api/devices/ghost/op/images", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "before": null, "after": null })
        );
    }

    #[tokio::test]
    async fn store_failures_map_to_fixed_messages() {
        let cases = [
            ("/api/devices", "Failed to fetch devices"),
            ("/api/devices/d1/operations", "Failed to fetch operations"),
            ("/api/devices/d1/op1/images", "Failed to fetch images"),
        ];
        for (uri, message) in cases {
            let response = get(test_app(MemoryStore::failing()), uri, None).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert_eq!(json_body(response).await, json!({ "error": message }), "{uri}");
        }
    }

    #[tokio::test]
    async fn allowed_origin_gets_credentialed_cors_headers() {
        let response = get(test_app(sample()), "/api/devices", Some(FRONTEND)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            FRONTEND
        );
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn unknown_origin_is_rejected_before_routing() {
        let store = Arc::new(sample());
        let catalog = CatalogService::new(store.clone(), "photos");
        let app = app(catalog, AllowedOrigins::parse(&[FRONTEND]).unwrap());

        let response = get(app, "/api/devices/d1/op1/images", Some("https://evil.example")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Not allowed by CORS" })
        );
        assert_eq!(store.signed.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin_succeeds() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/devices")
            .header(header::ORIGIN, FRONTEND)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = test_app(sample()).oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            FRONTEND
        );
    }

    #[tokio::test]
    async fn health_endpoints_reflect_store_health() {
        let response = get(test_app(sample()), "/healthz", None).await;
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));

        let response = get(test_app(sample()), "/readyz", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(test_app(MemoryStore::failing()), "/readyz", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            json_body(response).await,
            json!({ "status": "error", "checks": { "object_store": { "ok": false } } })
        );
    }
}
