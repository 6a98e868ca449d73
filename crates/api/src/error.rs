//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. Client errors carry their reason as a
//! plain-text body; server errors answer with a fixed message for the
//! operation that failed and never leak the underlying cause.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::orders::OrderError;

/// The operation a request was performing, used to pick the generic body of
/// a 500 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Register,
    ConfirmEmail,
    ShippingOptions,
    Products,
    CreateOrder,
}

impl Operation {
    /// Client-visible body for an unexpected failure.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Login => "An unexpected error occurred.",
            Self::Register => "Registration Error: An error occurred during user registration.",
            Self::ConfirmEmail => {
                "Email Confirmation Error: An error occurred during email confirmation."
            }
            Self::ShippingOptions => "Error: An error occurred while retrieving shipping options.",
            Self::Products => "Error: An error occurred while retrieving products.",
            Self::CreateOrder => {
                "Order Error: An unexpected error occurred while creating an order."
            }
        }
    }
}

/// Application-level error type for the order API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request from client; the reason is sent as the body.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Caller is not authenticated. Sent with an empty body.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found; the reason is sent as the body.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anything else.
    #[error("{operation:?} failed: {detail}")]
    Internal { operation: Operation, detail: String },
}

impl AppError {
    /// Wrap an unexpected failure of `operation`.
    pub fn internal(operation: Operation, err: impl std::fmt::Display) -> Self {
        Self::Internal {
            operation,
            detail: err.to_string(),
        }
    }

    /// Map an authentication failure to its response.
    #[must_use]
    pub fn from_auth(operation: Operation, err: AuthError) -> Self {
        let reason = match &err {
            AuthError::MissingField(_) => "Registration Error: All fields are required.",
            AuthError::InvalidEmail(_) => "Registration Error: Invalid email address.",
            AuthError::EmailInUse => "Registration Error: Email address is already in use.",
            AuthError::InvalidTimeZone(_) => "Registration Error: Invalid time zone.",
            AuthError::WeakPassword(_) => {
                "Registration Error: Password does not meet requirements."
            }
            AuthError::RegistrationRejected(_) => "Registration Error: Registration failed.",
            AuthError::InvalidConfirmationToken => "Email confirmation failed.",
            AuthError::UserNotFound => return Self::NotFound("User not found.".to_string()),
            AuthError::InvalidCredentials => return Self::Unauthorized,
            AuthError::Repository(_)
            | AuthError::PasswordHash
            | AuthError::ConfirmationSigning(_)
            | AuthError::Token(_)
            | AuthError::Delivery(_) => return Self::internal(operation, err),
        };
        Self::BadRequest(reason.to_string())
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Rejected(reason) => Self::BadRequest(reason.to_string()),
            OrderError::UnknownAccount(_) => Self::Unauthorized,
            OrderError::Repository(_) => Self::internal(Operation::CreateOrder, err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Internal { .. }) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        match self {
            Self::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason).into_response(),
            Self::NotFound(reason) => (StatusCode::NOT_FOUND, reason).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            // Don't expose internal error details to clients
            Self::Internal { operation, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                operation.failure_message(),
            )
                .into_response(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account id.
///
/// Call this after a token has been verified to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::RepositoryError;
    use crate::services::orders::OrderRejection;

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let err = AppError::internal(Operation::Products, "connection refused to 10.0.0.5");
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(response).await,
            "Error: An error occurred while retrieving products."
        );
    }

    #[tokio::test]
    async fn test_order_errors() {
        let response = AppError::from(OrderError::Rejected(OrderRejection::InvalidData)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(response).await, "Invalid order data.");

        let response = AppError::from(OrderError::Repository(RepositoryError::NotFound)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(response).await,
            "Order Error: An unexpected error occurred while creating an order."
        );
    }

    #[tokio::test]
    async fn test_auth_errors() {
        let response = AppError::from_auth(Operation::Login, AuthError::InvalidCredentials).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body(response).await.is_empty());

        let response = AppError::from_auth(Operation::ConfirmEmail, AuthError::UserNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(response).await, "User not found.");

        let response = AppError::from_auth(Operation::Register, AuthError::PasswordHash).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(response).await,
            "Registration Error: An error occurred during user registration."
        );
    }
}
