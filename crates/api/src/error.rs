//! HTTP error mapping.
//!
//! Every handler returns [`AppResult`]; failures render as
//! `{"error": <message>, "code": <CODE>}` with a matching status.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use dbprov_core::error::CoreError;

/// Message returned for every 5xx; details only go to the log.
const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// PostgreSQL SQLSTATE codes the API reacts to.
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_CHECK_VIOLATION: &str = "23514";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed body or query string, rejected before reaching a handler.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ErrorBody {
    fn new(code: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }

    fn internal() -> Self {
        Self::new("INTERNAL_ERROR", INTERNAL_MESSAGE)
    }
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Core(core) => core_status_and_body(core),
            AppError::Database(err) => database_status_and_body(err),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorBody::new("BAD_REQUEST", msg))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

fn core_status_and_body(err: &CoreError) -> (StatusCode, ErrorBody) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            ErrorBody::new("NOT_FOUND", format!("{entity} with id {id} not found")),
        ),
        CoreError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, ErrorBody::new("VALIDATION_ERROR", msg))
        }
        // Deciding an already-decided request is a client mistake, not a conflict.
        CoreError::InvalidState(msg) => {
            (StatusCode::BAD_REQUEST, ErrorBody::new("INVALID_STATE", msg))
        }
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new("CONFLICT", msg)),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal error");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
        }
    }
}

/// Map sqlx failures. Constraint violations that slipped past handler
/// validation become 4xx; everything else is a sanitized 500.
fn database_status_and_body(err: &sqlx::Error) -> (StatusCode, ErrorBody) {
    if let sqlx::Error::RowNotFound = err {
        return (
            StatusCode::NOT_FOUND,
            ErrorBody::new("NOT_FOUND", "Resource not found"),
        );
    }

    if let Some(db_err) = err.as_database_error() {
        let constraint = db_err.constraint().unwrap_or("unknown");
        match db_err.code().as_deref() {
            Some(PG_UNIQUE_VIOLATION) => {
                return (
                    StatusCode::CONFLICT,
                    ErrorBody::new("CONFLICT", format!("Duplicate value violates {constraint}")),
                );
            }
            Some(PG_CHECK_VIOLATION) => {
                return (
                    StatusCode::BAD_REQUEST,
                    ErrorBody::new("VALIDATION_ERROR", format!("Value rejected by {constraint}")),
                );
            }
            _ => {}
        }
    }

    tracing::error!(error = %err, "Database error");
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
}
