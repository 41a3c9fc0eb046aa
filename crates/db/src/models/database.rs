//! Provisioned database models.

use serde::Serialize;
use sqlx::FromRow;
use dbprov_core::types::{DbId, RequestId, Timestamp};

/// Status of a database that is live and billable.
pub const DATABASE_STATUS_ACTIVE: &str = "active";

/// A row from the `provisioned_databases` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProvisionedDatabase {
    pub id: DbId,
    pub request_id: RequestId,
    pub db_name: String,
    pub db_type: String,
    pub environment: String,
    pub host: String,
    pub port: i32,
    pub estimated_monthly_cost: f64,
    pub status: String,
    pub created_at: Timestamp,
}

/// An active database joined with the team that requested it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActiveDatabase {
    pub db_id: DbId,
    pub db_name: String,
    pub db_type: String,
    pub environment: String,
    pub host: String,
    pub port: i32,
    pub estimated_monthly_cost: f64,
    pub status: String,
    pub created_at: Timestamp,
    pub team_name: String,
}

/// DTO for inserting a provisioned database.
#[derive(Debug, Clone)]
pub struct CreateProvisionedDatabase {
    pub db_name: String,
    pub db_type: String,
    pub environment: String,
    pub host: String,
    pub port: i32,
    pub estimated_monthly_cost: f64,
}
