/// Provisioned database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Provisioning requests are keyed by a random UUID handed back to the submitter.
pub type RequestId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
