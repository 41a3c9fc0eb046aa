//! Handlers for submitting and listing provisioning requests.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use dbprov_core::provisioning::{
    validate_purpose, validate_team_name, DbSize, DbType, Environment, RequestStatus,
};
use dbprov_db::models::request::CreateProvisioningRequest;
use dbprov_db::repositories::RequestRepo;

use crate::error::AppResult;
use crate::response::{RequestList, RequestOutcome};
use crate::state::AppState;

/// Query parameters for `GET /requests`.
#[derive(Debug, Deserialize)]
pub struct ListRequestsParams {
    pub status: Option<String>,
}

/// POST /api/v1/requests
///
/// Submit a new database provisioning request. The request starts in
/// `pending` and waits for an approver.
pub async fn create_request(
    State(state): State<AppState>,
    payload: Result<Json<CreateProvisioningRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;

    validate_team_name(&input.team_name)?;
    validate_purpose(&input.purpose)?;
    let db_type = DbType::parse(&input.db_type)?;
    let environment = Environment::parse(&input.environment)?;
    let size = DbSize::parse(&input.size)?;

    let normalized = CreateProvisioningRequest {
        team_name: input.team_name,
        db_type: db_type.as_str().to_string(),
        environment: environment.as_str().to_string(),
        size: size.as_str().to_string(),
        purpose: input.purpose,
    };
    let created = RequestRepo::create(&state.pool, &normalized).await?;

    tracing::info!(
        request_id = %created.id,
        team = %created.team_name,
        db_type = %db_type,
        environment = %environment,
        size = %size,
        "Created provisioning request"
    );

    Ok((
        StatusCode::CREATED,
        Json(RequestOutcome {
            request_id: created.id,
            status: RequestStatus::Pending,
            message: "Request submitted for approval".to_string(),
        }),
    ))
}

/// GET /api/v1/requests?status=
///
/// List requests newest first, optionally filtered by status.
pub async fn list_requests(
    State(state): State<AppState>,
    params: Result<Query<ListRequestsParams>, QueryRejection>,
) -> AppResult<Json<RequestList>> {
    let Query(params) = params?;
    let status = params
        .status
        .as_deref()
        .map(RequestStatus::parse)
        .transpose()?;

    let requests = RequestRepo::list(&state.pool, status).await?;
    Ok(Json(RequestList { requests }))
}
