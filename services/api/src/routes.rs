use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use estate_hub::marketplace::{marketplace_router, MarketplaceService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_service_routes(service: Arc<MarketplaceService>) -> axum::Router {
    marketplace_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{in_process_marketplace, seed_accounts, DEV_ADMIN_TOKEN};
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    async fn status_of(app: axum::Router, uri: &str, token: Option<&str>) -> StatusCode {
        let mut request = Request::get(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        app.oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("route executes")
            .status()
    }

    #[tokio::test]
    async fn readiness_follows_flag() {
        let (marketplace, _) = in_process_marketplace();
        let state = app_state(false);
        let app = with_service_routes(marketplace.service).layer(Extension(state.clone()));

        assert_eq!(
            status_of(app.clone(), "/ready", None).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        state.readiness.store(true, Ordering::Release);
        assert_eq!(status_of(app.clone(), "/ready", None).await, StatusCode::OK);
        assert_eq!(status_of(app, "/health", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn seeded_admin_token_reaches_admin_routes() {
        let (marketplace, sessions) = in_process_marketplace();
        seed_accounts(&marketplace.store, &sessions).expect("seeded");
        let app = with_service_routes(marketplace.service).layer(Extension(app_state(true)));

        assert_eq!(
            status_of(app.clone(), "/api/admin/analytics", Some(DEV_ADMIN_TOKEN)).await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(app, "/api/admin/analytics", None).await,
            StatusCode::UNAUTHORIZED
        );
    }
}
