//! Storage for the order API.
//!
//! # Tables
//!
//! - `account` - Registered accounts (identity + profile + password hash)
//! - `shipping_option` - Flat-rate shipping choices
//! - `product` - Catalog products with image bytes
//! - `user_order` - Submitted orders (aggregate root)
//! - `order_detail` - Order line items, owned by `user_order`
//!
//! # Seams
//!
//! Handlers and services only see the [`Storage`] traits. [`PgStorage`] is the
//! production implementation; [`MemoryStorage`] backs tests and local runs
//! without a database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p rockland-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use rockland_core::{AccountId, Email, OrderId, ProductId, ShippingOptionId};

use crate::models::{Account, NewAccount, NewUserOrder, Product, ShippingOption, UserOrder};

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Storage backend is unavailable or refused the write.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// An account creation that has not been committed yet.
///
/// Dropping the handle without calling [`PendingRegistration::commit`] rolls
/// the account back.
#[async_trait]
pub trait PendingRegistration: Send {
    /// The account as it will exist once committed (id already assigned).
    fn account(&self) -> &Account;

    /// Make the account durable.
    async fn commit(self: Box<Self>) -> Result<Account, RepositoryError>;
}

/// Account persistence (the credential store's storage half).
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError>;

    /// The account and its password hash, for login.
    async fn credentials_for_username(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>, RepositoryError>;

    /// Open a transaction and insert the account inside it.
    ///
    /// Returns `RepositoryError::Conflict` if the username or email is taken.
    async fn begin_registration<'a>(
        &'a self,
        account: NewAccount,
        password_hash: String,
    ) -> Result<Box<dyn PendingRegistration + 'a>, RepositoryError>;

    /// Mark the email confirmed. Returns `true` if the flag changed.
    async fn confirm_email(&self, id: AccountId) -> Result<bool, RepositoryError>;
}

/// Read-only catalog lookups.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All shipping options in storage order.
    async fn shipping_options(&self) -> Result<Vec<ShippingOption>, RepositoryError>;

    async fn shipping_option(
        &self,
        id: ShippingOptionId,
    ) -> Result<Option<ShippingOption>, RepositoryError>;

    /// All products in storage order.
    async fn products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Products whose id is in `ids`; unknown ids are simply absent.
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order and all of its details atomically.
    async fn insert_order(&self, order: NewUserOrder) -> Result<UserOrder, RepositoryError>;

    async fn order(&self, id: OrderId) -> Result<Option<UserOrder>, RepositoryError>;
}

/// Everything the API needs from its backing store.
#[async_trait]
pub trait Storage: AccountStore + CatalogStore + OrderStore {
    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Map a unique-violation into `RepositoryError::Conflict` naming the constraint.
pub(crate) fn map_unique_violation(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        let constraint = db_err.constraint().unwrap_or("unique").to_owned();
        return RepositoryError::Conflict(constraint);
    }
    RepositoryError::Database(err)
}
