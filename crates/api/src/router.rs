//! Route table plus the HTTP middleware shared by the binary and tests.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Browsers may cache a CORS preflight for this long.
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(3600);

/// `/` and `/health` at the root, provisioning endpoints under `/api/v1`.
/// The provisioning endpoints are also served unprefixed (`/requests`,
/// `/approve`, `/databases`) for clients that predate the versioned prefix.
pub fn build_app_router(state: AppState) -> Router {
    let config = state.config.clone();

    let routes = Router::new()
        .merge(routes::health::router())
        .merge(routes::provisioning::router())
        .nest("/api/v1", routes::api_routes());

    with_middleware(routes, &config).with_state(state)
}

/// Layers are added innermost first; each `Router::layer` call re-boxes the
/// response body, which `CorsLayer` needs (`ResBody: Default`).
fn with_middleware(routes: Router<AppState>, config: &ServerConfig) -> Router<AppState> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    routes
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(PropagateRequestIdLayer::new(REQUEST_ID))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
        .layer(provisioning_cors(config))
}

/// The API is read with GET and mutated with JSON POSTs only.
pub fn provisioning_cors(config: &ServerConfig) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = Vec::with_capacity(config.cors_origins.len());
    for origin in &config.cors_origins {
        // Already checked by ServerConfig; this only guards hand-built configs.
        match HeaderValue::from_str(origin) {
            Ok(value) => origins.push(value),
            Err(e) => tracing::warn!(origin = %origin, error = %e, "Ignoring CORS origin"),
        }
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(PREFLIGHT_MAX_AGE)
}
