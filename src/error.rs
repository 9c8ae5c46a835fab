use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ColumnKind;

/// Query execution failed. Surfaced to the caller as-is, never retried.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("database not found at {}", .0.display())]
    MissingDatabase(PathBuf),
    #[error("failed to open database at {}: {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("query result is malformed: {0}")]
    Shape(#[from] ProfileError),
}

/// The result set cannot be described by the profiler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("result set has no columns")]
    NoColumns,
    #[error("column '{name}' appears more than once")]
    DuplicateColumn { name: String },
    #[error("column '{column}' has {actual} values, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("{kind} column '{column}' contains a {found} value at row {row}")]
    UnexpectedValue {
        column: String,
        kind: ColumnKind,
        found: &'static str,
        row: usize,
    },
}

#[derive(Debug, Error)]
pub enum InsightError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

#[derive(Debug)]
pub enum AppError {
    InvalidInput(String),
    DataSource(String),
    Profile(String),
    ChartError(String),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::DataSource(msg) => write!(f, "Data source error: {}", msg),
            AppError::Profile(msg) => write!(f, "Profile error: {}", msg),
            AppError::ChartError(msg) => write!(f, "Chart error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<InsightError> for AppError {
    fn from(err: InsightError) -> Self {
        match err {
            InsightError::DataSource(e) => AppError::from(e),
            InsightError::Profile(e) => AppError::Profile(e.to_string()),
        }
    }
}

impl From<DataSourceError> for AppError {
    fn from(err: DataSourceError) -> Self {
        AppError::DataSource(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ChartError(_) => StatusCode::BAD_REQUEST,
            AppError::DataSource(_) => StatusCode::BAD_GATEWAY,
            AppError::Profile(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_message(self) -> String {
        match self {
            AppError::InvalidInput(msg)
            | AppError::DataSource(msg)
            | AppError::Profile(msg)
            | AppError::ChartError(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.into_message();

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}
