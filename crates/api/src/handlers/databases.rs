use axum::extract::State;
use axum::Json;

use dbprov_core::provisioning::round_cents;
use dbprov_db::repositories::DatabaseRepo;

use crate::error::AppResult;
use crate::response::DatabaseInventory;
use crate::state::AppState;

/// GET /api/v1/databases
///
/// List active provisioned databases with their combined monthly cost.
pub async fn list_databases(State(state): State<AppState>) -> AppResult<Json<DatabaseInventory>> {
    let databases = DatabaseRepo::list_active(&state.pool).await?;
    let total: f64 = databases.iter().map(|db| db.estimated_monthly_cost).sum();

    Ok(Json(DatabaseInventory {
        total_count: databases.len(),
        total_monthly_cost: round_cents(total),
        databases,
    }))
}
