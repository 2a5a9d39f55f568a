use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application error types
///
/// `Clone` is required because a failed session load is handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppError {
    #[error("connection {0} not found")]
    ConnectionNotFound(String),

    #[error("connection named {0} already exists")]
    ConnectionAlreadyExists(String),

    #[error("schema {schema} not found within connection {connection}")]
    SchemaNotFound { schema: String, connection: String },

    #[error("table {table} not found within schema {schema}")]
    TableNotFound { table: String, schema: String },

    #[error("SQL execution failed: {0}")]
    SqlExecution(String),

    #[error("Catalog invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ConnectionNotFound(_) => (StatusCode::NOT_FOUND, "CONNECTION_NOT_FOUND"),
            AppError::ConnectionAlreadyExists(_) => (StatusCode::CONFLICT, "CONNECTION_ALREADY_EXISTS"),
            AppError::SchemaNotFound { .. } => (StatusCode::NOT_FOUND, "SCHEMA_NOT_FOUND"),
            AppError::TableNotFound { .. } => (StatusCode::NOT_FOUND, "TABLE_NOT_FOUND"),
            // the failure belongs to the introspected database, not to us
            AppError::SqlExecution(_) => (StatusCode::FAILED_DEPENDENCY, "SQL_EXECUTION_ERROR"),
            AppError::InvariantViolation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INVARIANT_VIOLATION"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let error_detail = match &self {
            AppError::SqlExecution(msg) => ErrorDetail::new(code, "Query against the target database failed")
                .with_details(msg.clone()),
            AppError::InvariantViolation(msg) => {
                tracing::error!("Catalog invariant violated: {}", msg);
                ErrorDetail::new(code, self.to_string())
            }
            _ => ErrorDetail::new(code, self.to_string()),
        };

        let body = Json(ErrorResponse {
            error: error_detail,
        });

        (status, body).into_response()
    }
}

/// Convert anyhow::Error to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert rusqlite::Error to AppError
impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_format() {
        let error = AppError::ConnectionNotFound("mydb".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::ConnectionAlreadyExists("a".into()), StatusCode::CONFLICT),
            (
                AppError::SchemaNotFound { schema: "s".into(), connection: "c".into() },
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::TableNotFound { table: "t".into(), schema: "s".into() },
                StatusCode::NOT_FOUND,
            ),
            (AppError::SqlExecution("boom".into()), StatusCode::FAILED_DEPENDENCY),
            (AppError::InvariantViolation("dup".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_error_messages() {
        let error = AppError::SchemaNotFound {
            schema: "shop".to_string(),
            connection: "mydb".to_string(),
        };
        assert_eq!(error.to_string(), "schema shop not found within connection mydb");

        let error = AppError::TableNotFound {
            table: "orders".to_string(),
            schema: "shop".to_string(),
        };
        assert_eq!(error.to_string(), "table orders not found within schema shop");
    }

    #[test]
    fn test_error_detail_creation() {
        let detail = ErrorDetail::new("TEST_CODE", "Test message");
        assert_eq!(detail.code, "TEST_CODE");
        assert_eq!(detail.message, "Test message");
        assert!(detail.details.is_none());
    }
}
