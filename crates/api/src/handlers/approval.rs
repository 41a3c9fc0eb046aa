//! Approval workflow: decide a pending request and, on approval, provision
//! its database in the same transaction.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use sqlx::PgConnection;

use dbprov_core::error::CoreError;
use dbprov_core::provisioning::{
    ensure_pending, generate_db_name, random_name_suffix, validate_approver, ApprovalAction,
    DbSize, DbType, Environment, RequestStatus,
};
use dbprov_db::models::database::{CreateProvisionedDatabase, ProvisionedDatabase};
use dbprov_db::models::request::{ApprovalDecision, ProvisioningRequest, RecordDecision};
use dbprov_db::repositories::{DatabaseRepo, RequestRepo};

use crate::error::AppResult;
use crate::response::RequestOutcome;
use crate::state::AppState;

/// POST /api/v1/approve
///
/// Approve or reject a pending request. Unknown requests yield 404 and
/// requests that were already decided yield 400 (`INVALID_STATE`).
pub async fn process_approval(
    State(state): State<AppState>,
    payload: Result<Json<ApprovalDecision>, JsonRejection>,
) -> AppResult<Json<RequestOutcome>> {
    let Json(input) = payload?;

    let action = ApprovalAction::parse(&input.action)?;
    validate_approver(&input.approver)?;

    let mut tx = state.pool.begin().await?;

    let request = RequestRepo::lock_for_update(&mut tx, input.request_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "ProvisioningRequest",
            id: input.request_id.to_string(),
        })?;
    ensure_pending(RequestStatus::parse(&request.status)?)?;

    let decision_status = action.resulting_status();
    let decided = RequestRepo::record_decision(
        &mut tx,
        request.id,
        &RecordDecision {
            status: decision_status.as_str().to_string(),
            approver: input.approver.clone(),
            notes: input.notes,
        },
    )
    .await?;

    if action == ApprovalAction::Approve {
        let database = provision_database(&mut tx, &decided, &state.config.provision_host).await?;
        tracing::info!(
            request_id = %decided.id,
            db_name = %database.db_name,
            port = database.port,
            estimated_monthly_cost = database.estimated_monthly_cost,
            "Provisioned database"
        );
    }

    tx.commit().await?;

    tracing::info!(
        request_id = %decided.id,
        approver = %input.approver,
        decision = %decision_status,
        "Request decided"
    );

    Ok(Json(RequestOutcome {
        request_id: decided.id,
        status: decision_status,
        message: format!("Request {decision_status} successfully"),
    }))
}

/// Create the database record for an approved request and move the request
/// to `provisioned`. Runs on the caller's transaction.
async fn provision_database(
    conn: &mut PgConnection,
    request: &ProvisioningRequest,
    host: &str,
) -> AppResult<ProvisionedDatabase> {
    let db_type = DbType::parse(&request.db_type)?;
    let environment = Environment::parse(&request.environment)?;
    let size = DbSize::parse(&request.size)?;

    let input = CreateProvisionedDatabase {
        db_name: generate_db_name(&request.team_name, environment, db_type, &random_name_suffix()),
        db_type: db_type.as_str().to_string(),
        environment: environment.as_str().to_string(),
        host: host.to_string(),
        port: i32::from(db_type.default_port()),
        estimated_monthly_cost: size.monthly_cost(),
    };

    let database = DatabaseRepo::create(&mut *conn, request.id, &input).await?;
    RequestRepo::mark_provisioned(&mut *conn, request.id).await?;
    Ok(database)
}
