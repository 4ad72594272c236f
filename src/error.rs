//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: '{value}'")]
    InvalidVar { name: &'static str, value: String },
    #[error("schema load: {0}")]
    Load(String),
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("duplicate column: table {table} column {column}")]
    DuplicateColumn { table: String, column: String },
    #[error("invalid primary key: table {table} column {column}")]
    InvalidPrimaryKey { table: String, column: String },
    #[error("validation: {0}")]
    Validation(String),
}

/// Connection could not be established within the retry policy.
#[derive(Error, Debug)]
#[error("database unreachable after {attempts} attempt(s): {source}")]
pub struct ConnectError {
    pub attempts: u32,
    #[source]
    pub source: sqlx::Error,
}

/// A single statement failed at the driver level.
#[derive(Error, Debug)]
#[error("query failed: {statement}: {cause}")]
pub struct QueryError {
    pub statement: String,
    #[source]
    pub cause: sqlx::Error,
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("schema reconciliation aborted: {0}")]
    Query(#[from] QueryError),
}

/// Anything that stops the service from reaching the serving phase.
#[derive(Error, Debug)]
pub enum BootError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// The four request-time operations, used for coarse failure messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrudOperation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for CrudOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CrudOperation::Create => "Creation failed",
            CrudOperation::Read => "Read failed",
            CrudOperation::Update => "Update failed",
            CrudOperation::Delete => "Deletion failed",
        };
        f.write_str(msg)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("unknown field '{field}' for table '{table}'")]
    UnknownField { table: String, field: String },
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Statement failure; the cause is logged where it happens and never reaches the client.
    #[error("{0}")]
    Failed(CrudOperation),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::UnknownField { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "unknown_field"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Failed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
