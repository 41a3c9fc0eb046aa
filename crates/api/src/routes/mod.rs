pub mod health;
pub mod provisioning;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /requests                                        submit (POST), list (GET, ?status=)
/// /approve                                         approve or reject (POST)
/// /databases                                       list provisioned databases (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(provisioning::router())
}
