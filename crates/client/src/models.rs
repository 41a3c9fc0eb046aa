//! Wire types exchanged with the provisioning API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dbprov_core::provisioning::{ApprovalAction, DbSize, DbType, Environment, RequestStatus};

/// Body of `POST /api/v1/requests`.
#[derive(Debug, Clone, Serialize)]
pub struct NewRequest {
    pub team_name: String,
    pub db_type: DbType,
    pub environment: Environment,
    pub size: DbSize,
    pub purpose: String,
}

/// Body of `POST /api/v1/approve`.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub request_id: Uuid,
    pub action: ApprovalAction,
    pub approver: String,
    pub notes: Option<String>,
}

/// Response to a submission or decision.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestOutcome {
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub message: String,
}

/// One request as returned by `GET /api/v1/requests`.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestSummary {
    pub id: Uuid,
    pub team_name: String,
    pub db_type: DbType,
    pub environment: Environment,
    pub size: DbSize,
    pub purpose: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestList {
    pub requests: Vec<RequestSummary>,
}

/// One active database as returned by `GET /api/v1/databases`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSummary {
    pub db_id: i64,
    pub db_name: String,
    pub db_type: DbType,
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub estimated_monthly_cost: f64,
    pub status: String,
    pub team_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseInventory {
    pub databases: Vec<DatabaseSummary>,
    pub total_count: usize,
    pub total_monthly_cost: f64,
}

/// Response of `GET /`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
    pub db_healthy: bool,
}
