//! Provisioning request models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use dbprov_core::types::{RequestId, Timestamp};

/// A row from the `provisioning_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProvisioningRequest {
    pub id: RequestId,
    pub team_name: String,
    pub db_type: String,
    pub environment: String,
    pub size: String,
    pub purpose: String,
    pub status: String,
    pub approver: Option<String>,
    pub approval_notes: Option<String>,
    pub created_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub provisioned_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

/// DTO for submitting a new provisioning request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateProvisioningRequest {
    pub team_name: String,
    pub db_type: String,
    pub environment: String,
    pub size: String,
    pub purpose: String,
}

/// DTO for an approve/reject decision on a pending request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApprovalDecision {
    pub request_id: RequestId,
    pub action: String,
    pub approver: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Decision fields written to the request row once validated.
#[derive(Debug, Clone)]
pub struct RecordDecision {
    pub status: String,
    pub approver: String,
    pub notes: Option<String>,
}
