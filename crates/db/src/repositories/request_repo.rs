//! Repository for the `provisioning_requests` table.

use sqlx::{PgConnection, PgPool};
use dbprov_core::provisioning::{RequestStatus, DEFAULT_LIST_LIMIT};
use dbprov_core::types::RequestId;

use crate::models::request::{CreateProvisioningRequest, ProvisioningRequest, RecordDecision};

/// Column list for provisioning_requests queries.
const COLUMNS: &str = "id, team_name, db_type, environment, size, purpose, status, \
    approver, approval_notes, created_at, approved_at, provisioned_at, updated_at";

/// Provides CRUD operations for provisioning requests.
pub struct RequestRepo;

impl RequestRepo {
    /// Insert a new pending request under a fresh UUID, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateProvisioningRequest,
    ) -> Result<ProvisioningRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO provisioning_requests
                (id, team_name, db_type, environment, size, purpose, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProvisioningRequest>(&query)
            .bind(RequestId::new_v4())
            .bind(&input.team_name)
            .bind(&input.db_type)
            .bind(&input.environment)
            .bind(&input.size)
            .bind(&input.purpose)
            .bind(RequestStatus::Pending.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find a request by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: RequestId,
    ) -> Result<Option<ProvisioningRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM provisioning_requests WHERE id = $1");
        sqlx::query_as::<_, ProvisioningRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List requests, newest first.
    ///
    /// With a status filter every matching row is returned; without one the
    /// listing is capped at [`DEFAULT_LIST_LIMIT`] rows.
    pub async fn list(
        pool: &PgPool,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ProvisioningRequest>, sqlx::Error> {
        match status {
            Some(status) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM provisioning_requests
                     WHERE status = $1
                     ORDER BY created_at DESC, id"
                );
                sqlx::query_as::<_, ProvisioningRequest>(&query)
                    .bind(status.as_str())
                    .fetch_all(pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM provisioning_requests
                     ORDER BY created_at DESC, id
                     LIMIT $1"
                );
                sqlx::query_as::<_, ProvisioningRequest>(&query)
                    .bind(DEFAULT_LIST_LIMIT)
                    .fetch_all(pool)
                    .await
            }
        }
    }

    /// Load a request and hold a row lock on it until the surrounding
    /// transaction ends, so two approvers cannot decide the same request.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: RequestId,
    ) -> Result<Option<ProvisioningRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM provisioning_requests WHERE id = $1 FOR UPDATE"
        );
        sqlx::query_as::<_, ProvisioningRequest>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Write an approval decision and stamp `approved_at`.
    pub async fn record_decision(
        conn: &mut PgConnection,
        id: RequestId,
        decision: &RecordDecision,
    ) -> Result<ProvisioningRequest, sqlx::Error> {
        let query = format!(
            "UPDATE provisioning_requests
             SET status = $2, approver = $3, approval_notes = $4,
                 approved_at = NOW(), updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProvisioningRequest>(&query)
            .bind(id)
            .bind(&decision.status)
            .bind(&decision.approver)
            .bind(&decision.notes)
            .fetch_one(&mut *conn)
            .await
    }

    /// Move an approved request to `provisioned` and stamp `provisioned_at`.
    pub async fn mark_provisioned(
        conn: &mut PgConnection,
        id: RequestId,
    ) -> Result<ProvisioningRequest, sqlx::Error> {
        let query = format!(
            "UPDATE provisioning_requests
             SET status = $2, provisioned_at = NOW(), updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProvisioningRequest>(&query)
            .bind(id)
            .bind(RequestStatus::Provisioned.as_str())
            .fetch_one(&mut *conn)
            .await
    }
}
