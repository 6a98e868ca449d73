//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError;
use crate::services::token::TokenError;

/// Errors that can occur during registration, login and confirmation.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required registration field was empty.
    #[error("required field missing: {0}")]
    MissingField(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] rockland_core::EmailError),

    /// Email already belongs to an account.
    #[error("email already registered")]
    EmailInUse,

    /// Time zone id is not in the host catalog.
    #[error("unknown time zone: {0}")]
    InvalidTimeZone(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(&'static str),

    /// Store refused the account (username taken).
    #[error("registration rejected: {0}")]
    RegistrationRejected(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Confirmation token did not verify for this account.
    #[error("invalid confirmation token")]
    InvalidConfirmationToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Confirmation token signing error.
    #[error("confirmation signing error: {0}")]
    ConfirmationSigning(String),

    /// JWT signing error.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Confirmation email could not be delivered.
    #[error("email delivery error: {0}")]
    Delivery(#[from] EmailError),
}
