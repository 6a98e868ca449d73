//! Account domain types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use rockland_core::{AccountId, Email};

/// A registered account.
///
/// Login identity (username, email, confirmation flag) and the profile
/// captured at registration live in one record. The password hash is never
/// loaded into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: Email,
    pub email_confirmed: bool,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub time_zone_id: String,
    pub opt_in_account_notices: bool,
    pub opt_in_product_notices: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub time_zone_id: String,
    pub opt_in_account_notices: bool,
    pub opt_in_product_notices: bool,
}

impl NewAccount {
    /// Materialize the account a store assigned `id` to.
    #[must_use]
    pub fn into_account(self, id: AccountId, created_at: DateTime<Utc>) -> Account {
        Account {
            id,
            username: self.username,
            email: self.email,
            email_confirmed: false,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            suffix: self.suffix,
            address1: self.address1,
            address2: self.address2,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
            time_zone_id: self.time_zone_id,
            opt_in_account_notices: self.opt_in_account_notices,
            opt_in_product_notices: self.opt_in_product_notices,
            created_at,
        }
    }
}

/// Registration form as posted by a client.
///
/// Every field defaults to empty so that missing and blank values get the
/// same "all fields are required" answer.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub time_zone_id: String,
    pub opt_in_account_notices: bool,
    pub opt_in_product_notices: bool,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("city", &self.city)
            .field("state", &self.state)
            .field("postal_code", &self.postal_code)
            .field("time_zone_id", &self.time_zone_id)
            .finish_non_exhaustive()
    }
}

/// Username and password posted to `/login`.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_debug_redacts_password() {
        let registration: Registration = serde_json::from_str(
            r#"{"username":"alice","password":"Secr3t!","timeZoneId":"UTC"}"#,
        )
        .unwrap();
        assert_eq!(registration.time_zone_id, "UTC");

        let debug = format!("{registration:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("Secr3t!"));
    }
}
