//! Stateless email confirmation tokens.
//!
//! A token is the URL-safe base64 HMAC-SHA256 of
//! `email-confirmation:{account id}:{normalized email}`, keyed with the JWT
//! signing key. Nothing is stored; a token stays valid for as long as the key
//! and the account's address do.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use rockland_core::{AccountId, Email};

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

const PURPOSE: &str = "email-confirmation";

/// Signs and checks confirmation tokens.
#[derive(Clone)]
pub struct ConfirmationTokens {
    key: SecretString,
}

impl ConfirmationTokens {
    #[must_use]
    pub const fn new(key: SecretString) -> Self {
        Self { key }
    }

    fn mac(&self, account_id: AccountId, email: &Email) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|e| AuthError::ConfirmationSigning(e.to_string()))?;
        mac.update(format!("{PURPOSE}:{account_id}:{}", email.normalized()).as_bytes());
        Ok(mac)
    }

    /// Token for `account_id` at `email`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ConfirmationSigning` if the key is unusable.
    pub fn issue(&self, account_id: AccountId, email: &Email) -> Result<String, AuthError> {
        let tag = self.mac(account_id, email)?.finalize().into_bytes();
        Ok(URL_SAFE_NO_PAD.encode(tag))
    }

    /// Constant-time check of `token`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ConfirmationSigning` if the key is unusable.
    pub fn verify(
        &self,
        token: &str,
        account_id: AccountId,
        email: &Email,
    ) -> Result<bool, AuthError> {
        let Ok(tag) = URL_SAFE_NO_PAD.decode(token.trim()) else {
            return Ok(false);
        };
        Ok(self.mac(account_id, email)?.verify_slice(&tag).is_ok())
    }
}

/// Link the confirmation email points at.
#[must_use]
pub fn confirmation_link(base_url: &str, token: &str, email: &Email) -> String {
    format!(
        "{}/confirm-email?token={}&email={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(token),
        urlencoding::encode(email.as_str()),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tokens() -> ConfirmationTokens {
        ConfirmationTokens::new(SecretString::from("k9#Qm2vL8x!Tz4Rw7pYb1Nc6Hd3Jf5Gs"))
    }

    #[test]
    fn test_token_verifies_for_same_account() {
        let email = Email::parse("a@x.com").unwrap();
        let token = tokens().issue(AccountId::new(7), &email).unwrap();

        assert!(tokens().verify(&token, AccountId::new(7), &email).unwrap());
        assert!(
            tokens()
                .verify(&token, AccountId::new(7), &Email::parse("A@X.com").unwrap())
                .unwrap()
        );
    }

    #[test]
    fn test_token_rejected_for_other_account() {
        let email = Email::parse("a@x.com").unwrap();
        let token = tokens().issue(AccountId::new(7), &email).unwrap();

        assert!(!tokens().verify(&token, AccountId::new(8), &email).unwrap());
        assert!(
            !tokens()
                .verify(&token, AccountId::new(7), &Email::parse("b@x.com").unwrap())
                .unwrap()
        );
        assert!(!tokens().verify("%%%", AccountId::new(7), &email).unwrap());
    }

    #[test]
    fn test_link_is_url_encoded() {
        let email = Email::parse("a+b@x.com").unwrap();
        let link = confirmation_link("https://orders.example.com/", "abc-_", &email);
        assert_eq!(
            link,
            "https://orders.example.com/confirm-email?token=abc-_&email=a%2Bb%40x.com"
        );
    }
}
