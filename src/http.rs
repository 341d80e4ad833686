//! The metrics scrape endpoint.
//!
//! Serves `GET <telemetry_path>` rendering the registry in Prometheus
//! text-exposition format, plus a `/health` endpoint retained as a
//! harmless operational convenience.

use std::future::Future;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower::make::Shared;
use tower::Layer;
use tower_http::compression::CompressionLayer;
use tower_http::normalize_path::NormalizePathLayer;

use crate::error::ExporterError;
use crate::registry::RegistryHandle;

/// Bind `listen_address` and serve the metrics endpoint until
/// `shutdown` resolves.
pub async fn serve(
    listen_address: String,
    telemetry_path: String,
    registry: RegistryHandle,
    gzip: bool,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ExporterError> {
    let listener =
        TcpListener::bind(&listen_address)
            .await
            .map_err(|source| ExporterError::HttpBind {
                address: listen_address.clone(),
                source,
            })?;

    serve_on(listener, &telemetry_path, registry, gzip, shutdown)
        .await
        .map_err(|source| ExporterError::HttpBind {
            address: listen_address,
            source,
        })
}

/// Serve the metrics endpoint on an already-bound `listener`, split out
/// from [`serve`] so callers that need to learn the bound ephemeral port
/// (or otherwise control binding themselves) can do so.
pub async fn serve_on(
    listener: TcpListener,
    telemetry_path: &str,
    registry: RegistryHandle,
    gzip: bool,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let router = router(telemetry_path, registry, gzip);

    // NormalizePathLayer strips a trailing slash before routing, matching
    // the original's echo/middleware.RemoveTrailingSlash(). It wraps the
    // Router in a plain tower::Service rather than another Router, so
    // axum::serve needs a MakeService adapter rather than axum's own
    // `Router::into_make_service`.
    let app = NormalizePathLayer::trim_trailing_slash().layer(router);

    axum::serve(listener, Shared::new(app))
        .with_graceful_shutdown(shutdown)
        .await
}

fn router(telemetry_path: &str, registry: RegistryHandle, gzip: bool) -> Router {
    let app = Router::new()
        .route(telemetry_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(registry);

    if gzip {
        app.layer(CompressionLayer::new())
    } else {
        app
    }
}

/// The OpenMetrics content type `prometheus_client::encoding::text::encode`'s
/// output requires so scrapers select the OpenMetrics parser (its output
/// ends in a `# EOF` line, which plain `text/plain` parsers don't expect).
const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

async fn metrics_handler(State(registry): State<RegistryHandle>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], registry.render())
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DynamicRegistry;

    #[test]
    fn router_builds_without_panicking_for_both_gzip_settings() {
        let registry = DynamicRegistry::new().handle();
        let _ = router("/metrics", registry.clone(), false);
        let _ = router("/metrics", registry, true);
    }
}
