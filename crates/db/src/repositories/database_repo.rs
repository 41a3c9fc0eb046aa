//! Repository for the `provisioned_databases` table.

use sqlx::{PgConnection, PgPool};
use dbprov_core::types::RequestId;

use crate::models::database::{
    ActiveDatabase, CreateProvisionedDatabase, ProvisionedDatabase, DATABASE_STATUS_ACTIVE,
};

/// Column list for provisioned_databases queries.
const COLUMNS: &str = "id, request_id, db_name, db_type, environment, host, port, \
    estimated_monthly_cost, status, created_at";

/// Provides CRUD operations for provisioned databases.
pub struct DatabaseRepo;

impl DatabaseRepo {
    /// Insert an active database for an approved request.
    pub async fn create(
        conn: &mut PgConnection,
        request_id: RequestId,
        input: &CreateProvisionedDatabase,
    ) -> Result<ProvisionedDatabase, sqlx::Error> {
        let query = format!(
            "INSERT INTO provisioned_databases
                (request_id, db_name, db_type, environment, host, port,
                 estimated_monthly_cost, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProvisionedDatabase>(&query)
            .bind(request_id)
            .bind(&input.db_name)
            .bind(&input.db_type)
            .bind(&input.environment)
            .bind(&input.host)
            .bind(input.port)
            .bind(input.estimated_monthly_cost)
            .bind(DATABASE_STATUS_ACTIVE)
            .fetch_one(&mut *conn)
            .await
    }

    /// Find the database provisioned for a request, if any.
    pub async fn find_by_request(
        pool: &PgPool,
        request_id: RequestId,
    ) -> Result<Option<ProvisionedDatabase>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM provisioned_databases WHERE request_id = $1");
        sqlx::query_as::<_, ProvisionedDatabase>(&query)
            .bind(request_id)
            .fetch_optional(pool)
            .await
    }

    /// List active databases with the owning team, newest first.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<ActiveDatabase>, sqlx::Error> {
        sqlx::query_as::<_, ActiveDatabase>(
            "SELECT d.id AS db_id, d.db_name, d.db_type, d.environment, d.host,
                    d.port, d.estimated_monthly_cost, d.status, d.created_at,
                    r.team_name
             FROM provisioned_databases d
             JOIN provisioning_requests r ON d.request_id = r.id
             WHERE d.status = $1
             ORDER BY d.created_at DESC, d.id DESC",
        )
        .bind(DATABASE_STATUS_ACTIVE)
        .fetch_all(pool)
        .await
    }
}
