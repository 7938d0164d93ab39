//! Error handling for the Site Inventory Ledger
//!
//! Every failure of a movement is reported to the caller; nothing is logged
//! and swallowed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::MovementRuleViolation;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    // Stock errors
    #[error("No stock on record for this product at {site}")]
    NoStockOnRecord { site: String },

    #[error("Insufficient stock at {site}. Available: {available}, requested: {requested}")]
    InsufficientStock {
        site: String,
        available: i32,
        requested: i32,
    },

    // Uniqueness errors
    #[error("Duplicate movement reference: {0}")]
    DuplicateReference(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Storage errors
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(resource: &str, id: Uuid) -> Self {
        AppError::NotFound(format!("{} {}", resource, id))
    }

    /// Whether repeating the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::DuplicateReference(_) | AppError::StorageError(_) => true,
            AppError::DatabaseError(err) => is_transient(err),
            _ => false,
        }
    }

    /// Stock errors are rejections, not faults
    pub fn is_insufficient_stock(&self) -> bool {
        matches!(
            self,
            AppError::NoStockOnRecord { .. } | AppError::InsufficientStock { .. }
        )
    }
}

// PostgreSQL SQLSTATE codes
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";
const CHECK_VIOLATION: &str = "23514";

/// Failures of the connection or the transaction itself, not of the request
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
        ),
        _ => false,
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(NUMERIC_VALUE_OUT_OF_RANGE) => {
                    return AppError::Validation {
                        field: "value".to_string(),
                        message: "Value is out of the storable range".to_string(),
                    }
                }
                Some(CHECK_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("input");
                    return AppError::Validation {
                        field: constraint.to_string(),
                        message: format!("Value violates constraint {}", constraint),
                    };
                }
                _ => {}
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<MovementRuleViolation> for AppError {
    fn from(violation: MovementRuleViolation) -> Self {
        AppError::Validation {
            field: violation.field().to_string(),
            message: violation.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), errors.to_string()));

        AppError::Validation { field, message }
    }
}

/// Map a unique-constraint violation to a domain error, anything else to a database error
pub(crate) fn map_unique_violation(err: sqlx::Error, on_conflict: impl FnOnce() -> AppError) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return on_conflict();
        }
    }
    AppError::from(err)
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<i32>,
    pub retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let detail = |code: &str, message: String, field: Option<String>| ErrorDetail {
            code: code.to_string(),
            message,
            field,
            available: None,
            retryable,
        };

        let (status, error_detail) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                detail("VALIDATION_ERROR", message.clone(), Some(field.clone())),
            ),
            AppError::NoStockOnRecord { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    available: Some(0),
                    ..detail("NO_STOCK_ON_RECORD", self.to_string(), Some("origin".to_string()))
                },
            ),
            AppError::InsufficientStock { available, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    available: Some(*available),
                    ..detail("INSUFFICIENT_STOCK", self.to_string(), Some("quantity".to_string()))
                },
            ),
            AppError::DuplicateReference(reference) => (
                StatusCode::CONFLICT,
                detail(
                    "DUPLICATE_REFERENCE",
                    format!("Movement reference {} already exists", reference),
                    Some("reference".to_string()),
                ),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                detail(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", field),
                    Some(field.clone()),
                ),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                detail("NOT_FOUND", format!("{} not found", resource), None),
            ),
            AppError::StorageError(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                detail("STORAGE_ERROR", format!("Storage error: {}", msg), None),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("CONFIGURATION_ERROR", format!("Configuration error: {}", msg), None),
            ),
            AppError::DatabaseError(_) if retryable => (
                StatusCode::SERVICE_UNAVAILABLE,
                detail("DATABASE_ERROR", "A database error occurred".to_string(), None),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("DATABASE_ERROR", "A database error occurred".to_string(), None),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("INTERNAL_ERROR", msg.clone(), None),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("INTERNAL_ERROR", "An internal server error occurred".to_string(), None),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_violation_maps_to_validation() {
        let err: AppError = MovementRuleViolation::MissingSite { field: "origin" }.into();
        match err {
            AppError::Validation { field, message } => {
                assert_eq!(field, "origin");
                assert!(message.contains("origin"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_insufficient_stock_message_reports_available() {
        let err = AppError::InsufficientStock {
            site: "Warehouse A".to_string(),
            available: 3,
            requested: 5,
        };
        assert!(err.to_string().contains("Available: 3"));
        assert!(err.is_insufficient_stock());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AppError::DuplicateReference("IN-240101-ABCDEF".to_string()).is_retryable());
        assert!(AppError::StorageError("lock timeout".to_string()).is_retryable());
        assert!(!AppError::Validation {
            field: "quantity".to_string(),
            message: "bad".to_string(),
        }
        .is_retryable());
        assert!(!AppError::NotFound("Product".to_string()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        let response = AppError::NoStockOnRecord {
            site: "B".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = AppError::DuplicateReference("X".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::from(MovementRuleViolation::SameSiteTransfer).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::Configuration("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    /// Database error carrying a SQLSTATE code
    #[derive(Debug)]
    struct PgError {
        code: &'static str,
        constraint: Option<&'static str>,
    }

    impl std::fmt::Display for PgError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "SQLSTATE {}", self.code)
        }
    }

    impl std::error::Error for PgError {}

    impl sqlx::error::DatabaseError for PgError {
        fn message(&self) -> &str {
            "database error"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.code.into())
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn pg_error(code: &'static str, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgError { code, constraint }))
    }

    #[test]
    fn test_only_transient_database_errors_are_retryable() {
        let retryable = [
            sqlx::Error::PoolTimedOut,
            sqlx::Error::PoolClosed,
            sqlx::Error::WorkerCrashed,
            sqlx::Error::Io(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            pg_error("40001", None),
            pg_error("40P01", None),
        ];
        for err in retryable {
            let err = AppError::from(err);
            assert!(err.is_retryable(), "{:?} should be retryable", err);
            assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
        }

        let permanent = [
            sqlx::Error::Configuration("bad url".into()),
            sqlx::Error::Protocol("unexpected message".to_string()),
            sqlx::Error::RowNotFound,
            pg_error("23503", Some("products_supplier_id_fkey")),
        ];
        for err in permanent {
            let err = AppError::from(err);
            assert!(!err.is_retryable(), "{:?} should not be retryable", err);
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_range_and_check_failures_are_validation_errors() {
        let err = AppError::from(pg_error("22003", None));
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "value"));
        assert!(!err.is_retryable());

        let err = AppError::from(pg_error("23514", Some("site_stock_quantity_check")));
        match &err {
            AppError::Validation { field, .. } => assert_eq!(field, "site_stock_quantity_check"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unique_violation_keeps_domain_error() {
        let err = map_unique_violation(pg_error("22003", None), || {
            AppError::DuplicateEntry("code".to_string())
        });
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
