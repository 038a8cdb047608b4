//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReflectError {
    #[error("schema query: {0}")]
    Query(#[from] sqlx::Error),
    #[error("table {table}: primary key column {column} not among reflected columns")]
    OrphanPrimaryKey { table: String, column: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    /// The URI's dialect has no engine compiled into this build. The CLI
    /// catches exactly this variant and prints driver guidance instead of
    /// crashing.
    #[error("no database engine for dialect '{dialect}'")]
    UnsupportedDriver { dialect: String },
    #[error(transparent)]
    Reflect(#[from] ReflectError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
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
            AppError::UnsupportedDriver { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "unsupported_driver")
            }
            AppError::Reflect(_) => (StatusCode::INTERNAL_SERVER_ERROR, "reflection_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
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
