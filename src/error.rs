//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every per-request failure ends up here, from request validation to store failures,
//! and is turned into a structured JSON response instead of crashing the worker.
//!
//! `AppError` implements `actix_web::error::ResponseError`. Server-side variants log
//! their detail and answer with a generic message, so store errors and other internals
//! never reach the client.
//! `From` implementations for `validator::ValidationErrors`, [`StoreError`],
//! [`TokenError`] and [`PasswordError`] allow handlers to use the `?` operator.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::auth::password::PasswordError;
use crate::auth::token::TokenError;
use crate::store::StoreError;

const GENERIC_SERVER_ERROR: &str = "Internal server error";

/// Represents all possible errors that can occur while handling a request.
///
/// Each variant corresponds to a specific type of error, usually carrying a message
/// that is safe to show to the caller. The two server-side variants carry diagnostic
/// detail that is logged but never serialized.
#[derive(Debug)]
pub enum AppError {
    /// Missing, invalid or expired credentials (HTTP 401).
    Unauthorized(String),
    /// A request that is structurally unusable, e.g. missing query parameters (HTTP 400).
    BadRequest(String),
    /// Input that parsed but failed validation rules (HTTP 422).
    ValidationError(String),
    /// A partial update carrying no applicable field (HTTP 400).
    NoFieldsProvided,
    /// A uniqueness violation such as an already registered email (HTTP 409).
    Conflict(String),
    /// The resource does not exist or is not owned by the caller (HTTP 404).
    /// Both cases share this variant.
    NotFound(String),
    /// A verification link that matched no actionable pending registration (HTTP 400).
    InvalidOrExpired,
    /// Unexpected server-side failure (HTTP 500). The message is only logged.
    InternalServerError(String),
    /// Failure reported by the store (HTTP 500). The message is only logged.
    DatabaseError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::NoFieldsProvided => write!(f, "Bad Request: No fields provided to update"),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InvalidOrExpired => write!(f, "Invalid or expired verification link"),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::ValidationError(msg) => HttpResponse::UnprocessableEntity().json(json!({
                "error": msg
            })),
            AppError::NoFieldsProvided => HttpResponse::BadRequest().json(json!({
                "error": "No fields provided to update"
            })),
            AppError::Conflict(msg) => HttpResponse::Conflict().json(json!({
                "error": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": msg
            })),
            AppError::InvalidOrExpired => HttpResponse::BadRequest().json(json!({
                "error": "Invalid, expired, or already used verification link. Please register again."
            })),
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                log::error!("{}", self);
                HttpResponse::InternalServerError().json(json!({
                    "error": GENERIC_SERVER_ERROR
                }))
            }
        }
    }
}

/// Unique violations become `Conflict`; everything else is a server-side failure.
impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::UniqueViolation(what) => AppError::Conflict(what),
            other => AppError::DatabaseError(other.to_string()),
        }
    }
}

/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Token failures other than a missing secret are caller errors.
impl From<TokenError> for AppError {
    fn from(error: TokenError) -> AppError {
        match error {
            TokenError::MissingSecret | TokenError::Signing(_) => {
                AppError::InternalServerError(error.to_string())
            }
            _ => AppError::Unauthorized("Invalid or expired token".into()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(error: PasswordError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_responses() {
        let error = AppError::Unauthorized("Invalid token".into());
        assert_eq!(error.error_response().status(), 401);

        let error = AppError::BadRequest("Missing token".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::ValidationError("email: invalid".into());
        assert_eq!(error.error_response().status(), 422);

        assert_eq!(AppError::NoFieldsProvided.error_response().status(), 400);

        let error = AppError::Conflict("Email already registered".into());
        assert_eq!(error.error_response().status(), 409);

        let error = AppError::NotFound("Task not found".into());
        assert_eq!(error.error_response().status(), 404);

        assert_eq!(AppError::InvalidOrExpired.error_response().status(), 400);

        let error = AppError::InternalServerError("Server error".into());
        assert_eq!(error.error_response().status(), 500);
    }

    #[actix_rt::test]
    async fn test_server_errors_hide_detail() {
        let error = AppError::DatabaseError("relation \"users\" does not exist".into());
        let response = error.error_response();
        assert_eq!(response.status(), 500);

        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let body = String::from_utf8_lossy(&body);
        assert!(!body.contains("relation"));
        assert!(body.contains(GENERIC_SERVER_ERROR));
    }

    #[test]
    fn test_store_error_mapping() {
        let conflict: AppError = StoreError::UniqueViolation("Email already registered".into()).into();
        assert!(matches!(conflict, AppError::Conflict(_)));

        let backend: AppError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(backend, AppError::DatabaseError(_)));
    }

    #[test]
    fn test_token_error_mapping() {
        let expired: AppError = TokenError::Expired.into();
        assert!(matches!(expired, AppError::Unauthorized(_)));

        let missing: AppError = TokenError::MissingSecret.into();
        assert!(matches!(missing, AppError::InternalServerError(_)));
    }
}
