//! Custom error types for the API service

use auth::AuthError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{DatabaseError, FieldErrors};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Input rejected, messages keyed by field
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No credentials were supplied
    #[error("Unauthorized")]
    Unauthorized,

    /// Credentials were supplied but are not valid
    #[error("Invalid token")]
    InvalidToken,

    /// The caller is authenticated but not allowed
    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    /// Not found, reported against a request field
    #[error("Not found: {0:?}")]
    NotFoundField(FieldErrors),

    /// The request conflicts with the stored state
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    TooManyRequests,

    /// A collaborator needed to complete the request is down
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ApiError {
    /// Validation error carrying a single message for `field`
    pub fn field(field: &str, message: &str) -> Self {
        ApiError::Validation(FieldErrors::single(field, message))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound | ApiError::NotFoundField(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(DatabaseError::UniqueViolation { .. })
            | ApiError::Database(DatabaseError::ForeignKeyViolation { .. }) => StatusCode::CONFLICT,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::Validation(errors) | ApiError::NotFoundField(errors) => json!(errors),
            ApiError::BadRequest(msg) => json!({ "detail": msg }),
            ApiError::Unauthorized => {
                json!({ "detail": "Authentication credentials were not provided." })
            }
            ApiError::InvalidToken => json!({ "detail": "Given token is not valid." }),
            ApiError::Forbidden => {
                json!({ "detail": "You do not have permission to perform this action." })
            }
            ApiError::NotFound => json!({ "detail": "Not found." }),
            ApiError::Conflict(msg) => json!({ "detail": msg }),
            ApiError::TooManyRequests => {
                json!({ "detail": "Too many attempts, try again later." })
            }
            ApiError::ServiceUnavailable(msg) => json!({ "detail": msg }),
            ApiError::InternalServerError => json!({ "detail": "Internal server error" }),
            ApiError::Database(e) => match e {
                DatabaseError::UniqueViolation { .. } => {
                    json!({ "detail": "The resource conflicts with an existing one." })
                }
                DatabaseError::ForeignKeyViolation { .. } => {
                    json!({ "detail": "The resource is still referenced by other resources." })
                }
                other => {
                    error!("Unhandled database error: {}", other);
                    json!({ "detail": "Internal server error" })
                }
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => ApiError::Validation(errors),
            AuthError::UserNotFound => {
                ApiError::NotFoundField(FieldErrors::single("username", "User not found."))
            }
            AuthError::InvalidCode => {
                ApiError::field("confirmation_code", "Invalid confirmation code.")
            }
            AuthError::InvalidToken => ApiError::InvalidToken,
            AuthError::TooManyAttempts => ApiError::TooManyRequests,
            AuthError::MailDelivery(e) => {
                error!("Confirmation code delivery failed: {}", e);
                ApiError::ServiceUnavailable(
                    "The confirmation code could not be delivered, try again later.".to_string(),
                )
            }
            AuthError::Token(e) => {
                error!("Failed to sign access token: {}", e);
                ApiError::InternalServerError
            }
            AuthError::Database(e) => ApiError::Database(e),
        }
    }
}
