//! `PostgreSQL` implementation of the storage traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use rockland_core::{
    AccountId, Amount, Email, OrderId, OrderStatus, ProductId, ShippingOptionId,
};

use super::{
    AccountStore, CatalogStore, OrderStore, PendingRegistration, RepositoryError, Storage,
    map_unique_violation,
};
use crate::models::{
    Account, NewAccount, NewUserOrder, OrderDetail, Product, ShippingAddress, ShippingOption,
    UserOrder,
};

const ACCOUNT_COLUMNS: &str = r"
    id, username, email, email_confirmed, first_name, middle_name, last_name, suffix,
    address1, address2, city, state, postal_code, time_zone_id,
    opt_in_account_notices, opt_in_product_notices, created_at
";

/// Storage backed by a `PgPool`.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_account(
        &self,
        filter: &str,
        bind: AccountFilter<'_>,
    ) -> Result<Option<AccountRow>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS}, password_hash FROM account WHERE {filter}");
        let query = sqlx::query_as::<_, AccountRow>(&sql);
        let query = match bind {
            AccountFilter::Id(id) => query.bind(id),
            AccountFilter::Text(value) => query.bind(value),
        };
        Ok(query.fetch_optional(&self.pool).await?)
    }
}

enum AccountFilter<'a> {
    Id(AccountId),
    Text(&'a str),
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: AccountId,
    username: String,
    email: String,
    email_confirmed: bool,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    suffix: Option<String>,
    address1: String,
    address2: Option<String>,
    city: String,
    state: String,
    postal_code: String,
    time_zone_id: String,
    opt_in_account_notices: bool,
    opt_in_product_notices: bool,
    created_at: DateTime<Utc>,
    password_hash: String,
}

impl AccountRow {
    fn into_parts(self) -> Result<(Account, String), RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let account = Account {
            id: self.id,
            username: self.username,
            email,
            email_confirmed: self.email_confirmed,
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
            created_at: self.created_at,
        };
        Ok((account, self.password_hash))
    }

    fn into_account(self) -> Result<Account, RepositoryError> {
        self.into_parts().map(|(account, _)| account)
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    account_id: AccountId,
    shipping_option_id: ShippingOptionId,
    purchase_order_pdf: Vec<u8>,
    order_total: Amount,
    shipping_address1: String,
    shipping_address2: Option<String>,
    shipping_city: String,
    shipping_state: String,
    shipping_postal_code: String,
    order_date: DateTime<Utc>,
    status: OrderStatus,
}

impl OrderRow {
    fn into_order(self, details: Vec<OrderDetail>) -> UserOrder {
        UserOrder {
            id: self.id,
            account_id: self.account_id,
            shipping_option_id: self.shipping_option_id,
            details,
            purchase_order_pdf: self.purchase_order_pdf,
            order_total: self.order_total,
            shipping_address: ShippingAddress {
                address1: self.shipping_address1,
                address2: self.shipping_address2,
                city: self.shipping_city,
                state: self.shipping_state,
                postal_code: self.shipping_postal_code,
            },
            order_date: self.order_date,
            status: self.status,
        }
    }
}

/// Registration held open in a database transaction.
struct PgPendingRegistration {
    tx: Transaction<'static, Postgres>,
    account: Account,
}

#[async_trait]
impl PendingRegistration for PgPendingRegistration {
    fn account(&self) -> &Account {
        &self.account
    }

    async fn commit(self: Box<Self>) -> Result<Account, RepositoryError> {
        self.tx.commit().await?;
        Ok(self.account)
    }
}

#[async_trait]
impl AccountStore for PgStorage {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        self.fetch_account("id = $1", AccountFilter::Id(id))
            .await?
            .map(AccountRow::into_account)
            .transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        self.fetch_account("username = $1", AccountFilter::Text(username))
            .await?
            .map(AccountRow::into_account)
            .transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let normalized = email.normalized();
        self.fetch_account("normalized_email = $1", AccountFilter::Text(&normalized))
            .await?
            .map(AccountRow::into_account)
            .transpose()
    }

    async fn credentials_for_username(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        self.fetch_account("username = $1", AccountFilter::Text(username))
            .await?
            .map(AccountRow::into_parts)
            .transpose()
    }

    #[instrument(skip(self, account, password_hash), fields(username = %account.username))]
    async fn begin_registration<'a>(
        &'a self,
        account: NewAccount,
        password_hash: String,
    ) -> Result<Box<dyn PendingRegistration + 'a>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r"
            INSERT INTO account (
                username, email, normalized_email, password_hash,
                first_name, middle_name, last_name, suffix,
                address1, address2, city, state, postal_code, time_zone_id,
                opt_in_account_notices, opt_in_product_notices
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {ACCOUNT_COLUMNS}, password_hash
            "
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(&account.username)
            .bind(account.email.as_str())
            .bind(account.email.normalized())
            .bind(&password_hash)
            .bind(&account.first_name)
            .bind(&account.middle_name)
            .bind(&account.last_name)
            .bind(&account.suffix)
            .bind(&account.address1)
            .bind(&account.address2)
            .bind(&account.city)
            .bind(&account.state)
            .bind(&account.postal_code)
            .bind(&account.time_zone_id)
            .bind(account.opt_in_account_notices)
            .bind(account.opt_in_product_notices)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_unique_violation)?;

        Ok(Box::new(PgPendingRegistration {
            tx,
            account: row.into_account()?,
        }))
    }

    async fn confirm_email(&self, id: AccountId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE account SET email_confirmed = TRUE WHERE id = $1 AND NOT email_confirmed",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl CatalogStore for PgStorage {
    async fn shipping_options(&self) -> Result<Vec<ShippingOption>, RepositoryError> {
        let options = sqlx::query_as::<_, ShippingOption>(
            "SELECT id, type, description, amount FROM shipping_option ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }

    async fn shipping_option(
        &self,
        id: ShippingOptionId,
    ) -> Result<Option<ShippingOption>, RepositoryError> {
        let option = sqlx::query_as::<_, ShippingOption>(
            "SELECT id, type, description, amount FROM shipping_option WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(option)
    }

    async fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, image FROM product ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, image FROM product WHERE id = ANY($1) ORDER BY id",
        )
        .bind(raw)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }
}

#[async_trait]
impl OrderStore for PgStorage {
    #[instrument(skip(self, order), fields(account_id = %order.account_id, lines = order.details.len()))]
    async fn insert_order(&self, order: NewUserOrder) -> Result<UserOrder, RepositoryError> {
        // Dropping `tx` on any early return rolls back the parent row too
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO user_order (
                account_id, shipping_option_id, purchase_order_pdf, order_total,
                shipping_address1, shipping_address2, shipping_city, shipping_state,
                shipping_postal_code, order_date, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, account_id, shipping_option_id, purchase_order_pdf, order_total,
                      shipping_address1, shipping_address2, shipping_city, shipping_state,
                      shipping_postal_code, order_date, status
            ",
        )
        .bind(order.account_id)
        .bind(order.shipping_option_id)
        .bind(&order.purchase_order_pdf)
        .bind(order.order_total)
        .bind(&order.shipping_address.address1)
        .bind(&order.shipping_address.address2)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.state)
        .bind(&order.shipping_address.postal_code)
        .bind(order.order_date)
        .bind(order.status)
        .fetch_one(&mut *tx)
        .await?;

        let mut details = Vec::with_capacity(order.details.len());
        for detail in &order.details {
            let stored = sqlx::query_as::<_, OrderDetail>(
                r"
                INSERT INTO order_detail (order_id, product_id, quantity, total_price)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, product_id, quantity, total_price
                ",
            )
            .bind(row.id)
            .bind(detail.product_id)
            .bind(detail.quantity)
            .bind(detail.total_price)
            .fetch_one(&mut *tx)
            .await?;
            details.push(stored);
        }

        tx.commit().await?;

        Ok(row.into_order(details))
    }

    async fn order(&self, id: OrderId) -> Result<Option<UserOrder>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, account_id, shipping_option_id, purchase_order_pdf, order_total,
                   shipping_address1, shipping_address2, shipping_city, shipping_state,
                   shipping_postal_code, order_date, status
            FROM user_order
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let details = sqlx::query_as::<_, OrderDetail>(
            r"
            SELECT id, order_id, product_id, quantity, total_price
            FROM order_detail
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.into_order(details)))
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
