//! `/`, `/health` and behaviour shared by every route.

mod common;

use axum::http::StatusCode;
use common::{body_json, get};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_reports_database_state(pool: PgPool) {
    let response = get(common::build_test_app(pool), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn root_lists_provisioning_endpoints(pool: PgPool) {
    let json = body_json(get(common::build_test_app(pool), "/").await).await;

    assert_eq!(json["service"], "Self-Service Database Provisioning");
    for endpoint in ["POST /api/v1/requests", "POST /api/v1/approve", "GET /api/v1/databases"] {
        assert!(json["endpoints"][endpoint].is_string(), "missing {endpoint}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unrouted_path_is_404(pool: PgPool) {
    let response = get(common::build_test_app(pool), "/api/v2/requests").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn every_response_carries_generated_request_id(pool: PgPool) {
    let response = get(common::build_test_app(pool), "/health").await;

    let header = response.headers().get("x-request-id").cloned();
    let value = header.expect("x-request-id header");
    assert!(uuid_like(value.to_str().unwrap()));
}

fn uuid_like(s: &str) -> bool {
    s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cors_allows_configured_origin(pool: PgPool) {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("origin", "http://localhost:8000")
        .body(Body::empty())
        .unwrap();
    let response = common::build_test_app(pool).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:8000"
    );
    assert!(response.headers().contains_key("x-request-id"));
}
