//! Signed identity tokens.
//!
//! Tokens are HS256 JWTs carrying the account id as `sub` together with the
//! full profile, so clients can render account details without another round
//! trip.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rockland_core::AccountId;

use crate::config::JwtConfig;
use crate::models::Account;

/// Errors from issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Claim serialization or signing failed.
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    /// Signature, issuer, audience or time window did not check out.
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// `sub` is not an account id.
    #[error("invalid token subject: {0}")]
    InvalidSubject(String),
}

/// Claims carried by an account token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountClaims {
    pub sub: String,
    pub unique_name: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    pub address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub time_zone: String,
    pub opt_in_account_notices: bool,
    pub opt_in_product_notices: bool,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl AccountClaims {
    /// The account this token was issued to.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidSubject` if `sub` is not numeric.
    pub fn account_id(&self) -> Result<AccountId, TokenError> {
        self.sub
            .parse()
            .map_err(|_| TokenError::InvalidSubject(self.sub.clone()))
    }
}

/// Mints and verifies account tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let key = config.key.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime: Duration::minutes(config.expiration_minutes),
        }
    }

    /// Issue a token for `account` valid from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Sign` if encoding fails.
    pub fn issue(&self, account: &Account) -> Result<String, TokenError> {
        self.issue_at(account, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Sign` if encoding fails.
    pub fn issue_at(&self, account: &Account, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = AccountClaims {
            sub: account.id.to_string(),
            unique_name: account.username.clone(),
            email: account.email.to_string(),
            given_name: account.first_name.clone(),
            family_name: account.last_name.clone(),
            middle_name: account.middle_name.clone(),
            suffix: account.suffix.clone(),
            address1: account.address1.clone(),
            address2: account.address2.clone(),
            city: account.city.clone(),
            state: account.state.clone(),
            postal_code: account.postal_code.clone(),
            time_zone: account.time_zone_id.clone(),
            opt_in_account_notices: account.opt_in_account_notices,
            opt_in_product_notices: account.opt_in_product_notices,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Sign)
    }

    /// Verify signature, issuer, audience and time window.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for any failed check.
    pub fn verify(&self, token: &str) -> Result<AccountClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        validation.validate_nbf = true;

        jsonwebtoken::decode::<AccountClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}
