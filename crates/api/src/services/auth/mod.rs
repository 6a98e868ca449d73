//! Authentication service.
//!
//! Password registration and login, plus email confirmation. Accounts are
//! created inside a storage transaction that is only committed once the
//! confirmation email has gone out and the session token has been minted.

mod confirmation;
mod error;

pub use confirmation::{ConfirmationTokens, confirmation_link};
pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use rockland_core::Email;

use crate::db::{AccountStore, RepositoryError};
use crate::models::{Account, NewAccount, Registration};
use crate::services::email::Mailer;
use crate::services::timezones::TimeZoneCatalog;
use crate::services::token::TokenIssuer;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// A freshly registered account and its first session token.
#[derive(Debug)]
pub struct Registered {
    pub account: Account,
    pub token: String,
}

/// Authentication service.
///
/// Borrows everything it needs from application state for the duration of
/// one request.
pub struct AuthService<'a, S: ?Sized> {
    accounts: &'a S,
    mailer: &'a dyn Mailer,
    tokens: &'a TokenIssuer,
    confirmations: &'a ConfirmationTokens,
    time_zones: &'a TimeZoneCatalog,
    base_url: &'a str,
}

impl<'a, S: AccountStore + ?Sized> AuthService<'a, S> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        accounts: &'a S,
        mailer: &'a dyn Mailer,
        tokens: &'a TokenIssuer,
        confirmations: &'a ConfirmationTokens,
        time_zones: &'a TimeZoneCatalog,
        base_url: &'a str,
    ) -> Self {
        Self {
            accounts,
            mailer,
            tokens,
            confirmations,
            time_zones,
            base_url,
        }
    }

    /// Register a new account, email a confirmation link and mint a token.
    ///
    /// Checks run in a fixed order and stop at the first failure: required
    /// fields, email syntax, email availability, time zone, password policy,
    /// then the store's own uniqueness constraints.
    ///
    /// # Errors
    ///
    /// Returns a validation variant of `AuthError` for rejected input and
    /// `Repository`, `PasswordHash`, `Delivery` or `Token` for internal
    /// failures. On any error the account is not persisted.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<Registered, AuthError> {
        require_fields(&registration)?;

        let email = Email::parse(&registration.email)?;

        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        if !self.time_zones.contains(&registration.time_zone_id) {
            return Err(AuthError::InvalidTimeZone(registration.time_zone_id));
        }

        validate_password(&registration.password)?;
        let password_hash = hash_password(&registration.password)?;

        let new_account = NewAccount {
            username: registration.username,
            email,
            first_name: registration.first_name,
            middle_name: non_blank(registration.middle_name),
            last_name: registration.last_name,
            suffix: non_blank(registration.suffix),
            address1: registration.address1,
            address2: non_blank(registration.address2),
            city: registration.city,
            state: registration.state,
            postal_code: registration.postal_code,
            time_zone_id: registration.time_zone_id,
            opt_in_account_notices: registration.opt_in_account_notices,
            opt_in_product_notices: registration.opt_in_product_notices,
        };

        let pending = self
            .accounts
            .begin_registration(new_account, password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(constraint) if constraint.contains("email") => {
                    AuthError::EmailInUse
                }
                RepositoryError::Conflict(constraint) => {
                    AuthError::RegistrationRejected(constraint)
                }
                other => AuthError::Repository(other),
            })?;

        // Any `?` below drops `pending`, which rolls the account back
        let account = pending.account();
        let confirmation = self.confirmations.issue(account.id, &account.email)?;
        let link = confirmation_link(self.base_url, &confirmation, &account.email);

        self.mailer
            .send_email_confirmation(&account.email, &account.first_name, &link)
            .await
            .inspect_err(|e| {
                tracing::error!(error = %e, email = %account.email, "Failed to send confirmation email");
            })?;

        let token = self.tokens.issue(account)?;

        let account = pending.commit().await?;
        tracing::info!(account_id = %account.id, "Account registered");

        Ok(Registered { account, token })
    }

    /// Login with username and password, returning a fresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let (account, password_hash) = self
            .accounts
            .credentials_for_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(self.tokens.issue(&account)?)
    }

    /// Confirm the address behind a confirmation link.
    ///
    /// Confirming an already-confirmed account with a valid token succeeds
    /// again.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has `email` and
    /// `AuthError::InvalidConfirmationToken` if the token does not verify.
    #[instrument(skip(self, token))]
    pub async fn confirm_email(&self, token: &str, email: &str) -> Result<Account, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;

        let mut account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.confirmations.verify(token, account.id, &account.email)? {
            return Err(AuthError::InvalidConfirmationToken);
        }

        if self.accounts.confirm_email(account.id).await? {
            tracing::info!(account_id = %account.id, "Email confirmed");
        }
        account.email_confirmed = true;

        Ok(account)
    }
}

fn require_fields(registration: &Registration) -> Result<(), AuthError> {
    let required = [
        ("username", &registration.username),
        ("password", &registration.password),
        ("email", &registration.email),
        ("firstName", &registration.first_name),
        ("lastName", &registration.last_name),
        ("address1", &registration.address1),
        ("city", &registration.city),
        ("state", &registration.state),
        ("postalCode", &registration.postal_code),
        ("timeZoneId", &registration.time_zone_id),
    ];

    match required.into_iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(AuthError::MissingField(name)),
        None => Ok(()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validate password policy: length, digit, lowercase, uppercase and a
/// non-alphanumeric character.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword("password is too short"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword("password needs a digit"));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(AuthError::WeakPassword("password needs a lowercase letter"));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(AuthError::WeakPassword("password needs an uppercase letter"));
    }
    if password.chars().all(char::is_alphanumeric) {
        return Err(AuthError::WeakPassword("password needs a symbol"));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use secrecy::SecretString;

    use super::*;
    use crate::config::JwtConfig;
    use crate::db::MemoryStorage;
    use crate::services::email::EmailError;

    const KEY: &str = "k9#Qm2vL8x!Tz4Rw7pYb1Nc6Hd3Jf5Gs";

    #[derive(Default)]
    struct RecordingMailer {
        links: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_email_confirmation(
            &self,
            to: &Email,
            _first_name: &str,
            link: &str,
        ) -> Result<(), EmailError> {
            if self.fail {
                return Err(EmailError::InvalidAddress(to.to_string()));
            }
            self.links.lock().unwrap().push(link.to_string());
            Ok(())
        }
    }

    struct Fixture {
        storage: MemoryStorage,
        mailer: RecordingMailer,
        tokens: TokenIssuer,
        confirmations: ConfirmationTokens,
        time_zones: TimeZoneCatalog,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                storage: MemoryStorage::new(),
                mailer: RecordingMailer::default(),
                tokens: TokenIssuer::new(&JwtConfig {
                    key: SecretString::from(KEY),
                    issuer: "rockland".to_string(),
                    audience: "orders".to_string(),
                    expiration_minutes: 60,
                }),
                confirmations: ConfirmationTokens::new(SecretString::from(KEY)),
                time_zones: TimeZoneCatalog::from_names(["America/New_York", "UTC"]),
            }
        }

        fn service(&self) -> AuthService<'_, MemoryStorage> {
            AuthService::new(
                &self.storage,
                &self.mailer,
                &self.tokens,
                &self.confirmations,
                &self.time_zones,
                "https://orders.example.com",
            )
        }
    }

    fn alice() -> Registration {
        Registration {
            username: "alice".to_string(),
            password: "Secr3t!".to_string(),
            email: "a@x.com".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            address1: "1 Main".to_string(),
            city: "X".to_string(),
            state: "NY".to_string(),
            postal_code: "10001".to_string(),
            time_zone_id: "America/New_York".to_string(),
            ..Registration::default()
        }
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("Secr3t!").is_ok());
        assert!(validate_password("S3t!").is_err());
        assert!(validate_password("Secret!").is_err());
        assert!(validate_password("secr3t!").is_err());
        assert!(validate_password("SECR3T!").is_err());
        assert!(validate_password("Secr3t1").is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Secr3t!").unwrap();
        assert!(verify_password("Secr3t!", &hash).is_ok());
        assert!(verify_password("Secr3t?", &hash).is_err());
    }

    #[tokio::test]
    async fn test_register_sends_link_and_issues_token() {
        let fixture = Fixture::new();
        let registered = fixture.service().register(alice()).await.unwrap();

        assert!(!registered.token.is_empty());
        assert!(!registered.account.email_confirmed);
        let links = fixture.mailer.links.lock().unwrap();
        assert_eq!(links.len(), 1);
        let link = links.first().unwrap();
        assert!(link.starts_with("https://orders.example.com/confirm-email?token="));
        assert!(link.ends_with("&email=a%40x.com"));
    }

    #[tokio::test]
    async fn test_register_rejections_in_order() {
        let fixture = Fixture::new();
        let service = fixture.service();

        let mut missing = alice();
        missing.city = "  ".to_string();
        missing.email = "not-an-email".to_string();
        assert!(matches!(
            service.register(missing).await,
            Err(AuthError::MissingField("city"))
        ));

        let mut bad_email = alice();
        bad_email.email = "not-an-email".to_string();
        assert!(matches!(
            service.register(bad_email).await,
            Err(AuthError::InvalidEmail(_))
        ));

        let mut bad_zone = alice();
        bad_zone.time_zone_id = "Mars/Olympus_Mons".to_string();
        bad_zone.password = "weak".to_string();
        assert!(matches!(
            service.register(bad_zone).await,
            Err(AuthError::InvalidTimeZone(_))
        ));

        let mut weak = alice();
        weak.password = "password".to_string();
        assert!(matches!(
            service.register(weak).await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_and_username() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register(alice()).await.unwrap();

        let mut same_email = alice();
        same_email.username = "alice2".to_string();
        same_email.email = "A@X.COM".to_string();
        assert!(matches!(
            service.register(same_email).await,
            Err(AuthError::EmailInUse)
        ));

        let mut same_username = alice();
        same_username.email = "other@x.com".to_string();
        assert!(matches!(
            service.register(same_username).await,
            Err(AuthError::RegistrationRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_delivery_rolls_back_account() {
        let mut fixture = Fixture::new();
        fixture.mailer.fail = true;

        assert!(matches!(
            fixture.service().register(alice()).await,
            Err(AuthError::Delivery(_))
        ));
        assert!(fixture.storage.find_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register(alice()).await.unwrap();

        let token = service.login("alice", "Secr3t!").await.unwrap();
        let claims = fixture.tokens.verify(&token).unwrap();
        assert_eq!(claims.unique_name, "alice");

        assert!(matches!(
            service.login("alice", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("bob", "Secr3t!").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_confirm_email_is_idempotent() {
        let fixture = Fixture::new();
        let service = fixture.service();
        let registered = service.register(alice()).await.unwrap();
        let token = fixture
            .confirmations
            .issue(registered.account.id, &registered.account.email)
            .unwrap();

        assert!(service.confirm_email(&token, "a@x.com").await.unwrap().email_confirmed);
        assert!(service.confirm_email(&token, "a@x.com").await.is_ok());
        let stored = fixture.storage.find_by_username("alice").await.unwrap().unwrap();
        assert!(stored.email_confirmed);

        assert!(matches!(
            service.confirm_email("bogus", "a@x.com").await,
            Err(AuthError::InvalidConfirmationToken)
        ));
        assert!(matches!(
            service.confirm_email(&token, "nobody@x.com").await,
            Err(AuthError::UserNotFound)
        ));
    }
}
