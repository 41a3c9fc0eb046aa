use std::collections::BTreeMap;

use axum::Json;
use serde::Serialize;

/// Human-readable service name reported by `GET /`.
pub const SERVICE_NAME: &str = "Self-Service Database Provisioning";

/// Service descriptor returned at the root path.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// GET /
///
/// Describe the service and list its endpoints.
pub async fn describe() -> Json<ServiceInfo> {
    let endpoints = BTreeMap::from([
        ("GET /health", "Service and database health"),
        ("POST /api/v1/requests", "Submit new database request"),
        ("GET /api/v1/requests", "List requests, optionally filtered by ?status="),
        ("POST /api/v1/approve", "Approve or reject a pending request"),
        ("GET /api/v1/databases", "List provisioned databases"),
    ]);

    Json(ServiceInfo {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        endpoints,
    })
}
