//! Account route handlers: login, registration and email confirmation.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Operation, Result};
use crate::models::{LoginRequest, Registration};
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Body returned by login and registration.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Query string of the emailed confirmation link.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfirmEmailQuery {
    pub token: String,
    pub email: String,
}

/// Exchange a username and password for a token.
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let token = state
        .auth()
        .login(&request.username, &request.password)
        .await
        .map_err(|e| {
            if !matches!(e, AuthError::InvalidCredentials) {
                tracing::error!(error = %e, username = %request.username, "Login failed unexpectedly");
            }
            AppError::from_auth(Operation::Login, e)
        })?;

    Ok(Json(TokenResponse { token }))
}

/// Create an account, send the confirmation email and return a token.
#[instrument(skip(state, registration), fields(username = %registration.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<Json<TokenResponse>> {
    let context = format!("{registration:?}");

    let registered = state.auth().register(registration).await.map_err(|e| {
        let err = AppError::from_auth(Operation::Register, e);
        if matches!(err, AppError::Internal { .. }) {
            tracing::error!(error = %err, registration = %context, "Registration failed");
        }
        err
    })?;

    Ok(Json(TokenResponse {
        token: registered.token,
    }))
}

/// Mark an address confirmed.
#[instrument(skip(state, query), fields(email = %query.email))]
pub async fn confirm_email(
    State(state): State<AppState>,
    Query(query): Query<ConfirmEmailQuery>,
) -> Result<&'static str> {
    state
        .auth()
        .confirm_email(&query.token, &query.email)
        .await
        .map_err(|e| AppError::from_auth(Operation::ConfirmEmail, e))?;

    Ok("Email confirmed successfully.")
}
