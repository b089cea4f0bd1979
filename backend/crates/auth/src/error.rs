//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.
//!
//! Every variant that means "you are not authenticated" renders the same
//! body, so callers cannot tell a missing token from an expired one or a
//! disabled account.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Any login failure. The underlying reason is logged, never returned.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token signature is valid but `now >= exp`
    #[error("Token expired")]
    TokenExpired,

    /// Bad signature, unparsable structure, or missing/mistyped claims
    #[error("Token malformed")]
    TokenMalformed,

    /// No identity was established for this request
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient privileges")]
    Forbidden,

    #[error("Lock time must be in the future")]
    InvalidLockWindow,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Role not found")]
    RoleNotFound,

    #[error("User name already exists")]
    UsernameTaken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Password validation failed: {0}")]
    PasswordValidation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenMalformed
            | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::AccountNotFound | AuthError::RoleNotFound => StatusCode::NOT_FOUND,
            AuthError::UsernameTaken => StatusCode::CONFLICT,
            AuthError::InvalidLockWindow
            | AuthError::Validation(_)
            | AuthError::PasswordValidation(_) => StatusCode::BAD_REQUEST,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenMalformed
            | AuthError::Unauthenticated => ErrorKind::Unauthorized,
            AuthError::Forbidden => ErrorKind::Forbidden,
            AuthError::AccountNotFound | AuthError::RoleNotFound => ErrorKind::NotFound,
            AuthError::UsernameTaken => ErrorKind::Conflict,
            AuthError::InvalidLockWindow
            | AuthError::Validation(_)
            | AuthError::PasswordValidation(_) => ErrorKind::BadRequest,
            AuthError::Database(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError
    ///
    /// Token failures collapse into the generic unauthenticated message and
    /// server-side failures never echo their cause.
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::TokenExpired | AuthError::TokenMalformed | AuthError::Unauthenticated => {
                AppError::unauthorized(AuthError::Unauthenticated.to_string())
            }
            AuthError::Database(_) | AuthError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Rejected login attempt");
            }
            AuthError::Forbidden => {
                tracing::info!("Request denied: missing role");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}
