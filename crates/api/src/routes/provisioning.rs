//! Route definitions for the provisioning workflow.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{approval, databases, requests};
use crate::state::AppState;

/// Provisioning routes, nested under `/api/v1`.
///
/// ```text
/// POST   /requests      create_request
/// GET    /requests      list_requests
/// POST   /approve       process_approval
/// GET    /databases     list_databases
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/requests",
            post(requests::create_request).get(requests::list_requests),
        )
        .route("/approve", post(approval::process_approval))
        .route("/databases", get(databases::list_databases))
}
