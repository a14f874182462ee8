use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::utils::validation::{FieldErrors, INVALID_CHOICE};

/// Stable, machine-readable identifiers carried in every error body.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Field-level validation failure. HTTP 400.
    #[error("Please correct the errors below.")]
    Validation(FieldErrors),

    /// Unique constraint hit. HTTP 409.
    #[error("Duplicate entry already exists.")]
    Duplicate,

    /// HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Malformed request outside any form. HTTP 400.
    #[error("{0}")]
    BadRequest(String),

    /// HTTP 401.
    #[error("{0}")]
    Unauthorized(String),

    /// HTTP 403.
    #[error("{0}")]
    PermissionDenied(String),

    /// HTTP 500. The message sent to the client never includes the cause.
    #[error("Database error")]
    Storage(#[source] sqlx::Error),

    /// HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => error_code::VALIDATION_FAILED,
            AppError::Duplicate => error_code::ALREADY_EXISTS,
            AppError::NotFound(_) => error_code::NOT_FOUND,
            AppError::BadRequest(_) => error_code::BAD_REQUEST,
            AppError::Unauthorized(_) => error_code::UNAUTHENTICATED,
            AppError::PermissionDenied(_) => error_code::PERMISSION_DENIED,
            AppError::Storage(_) => error_code::STORAGE_ERROR,
            AppError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// Form-level view of the error, if it is one a form can display.
    pub fn as_field_errors(&self) -> Option<FieldErrors> {
        match self {
            AppError::Validation(errors) => Some(errors.clone()),
            AppError::Duplicate => Some(FieldErrors::non_field(self.to_string())),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::Duplicate;
            }
            if db_err.is_foreign_key_violation() {
                return AppError::Validation(FieldErrors::non_field(INVALID_CHOICE));
            }
            if db_err.is_check_violation() {
                return AppError::Validation(FieldErrors::non_field("Enter a valid value."));
            }
        }
        AppError::Storage(e)
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Duplicate => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Storage(e) => error!(error = %e, "Storage failure"),
            AppError::Internal(msg) => error!(error = %msg, "Internal failure"),
            _ => {}
        }

        let mut body = json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });
        if let AppError::Validation(errors) = self {
            body["errors"] = json!(errors);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}
