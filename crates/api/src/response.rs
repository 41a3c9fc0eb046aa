//! Response payloads shared by the provisioning handlers.
//!
//! The provisioning endpoints answer with small named objects
//! (`{ "requests": [...] }`, `{ "databases": [...], ... }`) instead of a
//! generic envelope; these structs pin that shape at compile time.

use serde::Serialize;

use dbprov_core::provisioning::RequestStatus;
use dbprov_core::types::RequestId;
use dbprov_db::models::database::ActiveDatabase;
use dbprov_db::models::request::ProvisioningRequest;

/// Result of submitting or deciding a request.
#[derive(Debug, Serialize)]
pub struct RequestOutcome {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub message: String,
}

/// `GET /requests` body.
#[derive(Debug, Serialize)]
pub struct RequestList {
    pub requests: Vec<ProvisioningRequest>,
}

/// `GET /databases` body.
#[derive(Debug, Serialize)]
pub struct DatabaseInventory {
    pub databases: Vec<ActiveDatabase>,
    pub total_count: usize,
    pub total_monthly_cost: f64,
}
