//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Storage;
use crate::services::auth::{AuthService, ConfirmationTokens};
use crate::services::email::Mailer;
use crate::services::timezones::TimeZoneCatalog;
use crate::services::token::TokenIssuer;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Storage and mail delivery are
/// trait objects so tests can run the real router without a database or an
/// SMTP relay.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    storage: Arc<dyn Storage>,
    mailer: Arc<dyn Mailer>,
    tokens: TokenIssuer,
    confirmations: ConfirmationTokens,
    time_zones: TimeZoneCatalog,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Token signing and email confirmation both key off `config.jwt.key`.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        storage: Arc<dyn Storage>,
        mailer: Arc<dyn Mailer>,
        time_zones: TimeZoneCatalog,
    ) -> Self {
        let tokens = TokenIssuer::new(&config.jwt);
        let confirmations = ConfirmationTokens::new(config.jwt.key.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                mailer,
                tokens,
                confirmations,
                time_zones,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the backing store.
    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        self.inner.storage.as_ref()
    }

    /// Get a reference to the token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Get a reference to the host time zone catalog.
    #[must_use]
    pub fn time_zones(&self) -> &TimeZoneCatalog {
        &self.inner.time_zones
    }

    /// Authentication service borrowing this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_, dyn Storage> {
        AuthService::new(
            self.inner.storage.as_ref(),
            self.inner.mailer.as_ref(),
            &self.inner.tokens,
            &self.inner.confirmations,
            &self.inner.time_zones,
            &self.inner.config.base_url,
        )
    }
}
