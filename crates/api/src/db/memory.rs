//! In-process storage for tests and database-free local runs.
//!
//! Mirrors the transactional behavior of [`super::PgStorage`]: a registration
//! is invisible until committed, and an order whose detail insert fails leaves
//! no trace.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use rockland_core::{
    AccountId, Amount, Email, OrderDetailId, OrderId, ProductId, ShippingOptionId,
};

use super::{
    AccountStore, CatalogStore, OrderStore, PendingRegistration, RepositoryError, Storage,
};
use crate::models::{
    Account, NewAccount, NewUserOrder, OrderDetail, Product, ShippingOption, UserOrder,
};

const USERNAME_CONSTRAINT: &str = "account_username_key";
const EMAIL_CONSTRAINT: &str = "account_normalized_email_key";

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<AccountId, (Account, String)>,
    shipping_options: BTreeMap<ShippingOptionId, ShippingOption>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, UserOrder>,
    next_account_id: i32,
    next_shipping_option_id: i32,
    next_product_id: i32,
    next_order_id: i32,
    next_detail_id: i32,
}

impl Tables {
    fn conflict_for(&self, username: &str, email: &Email) -> Option<&'static str> {
        let normalized = email.normalized();
        for (account, _) in self.accounts.values() {
            if account.username == username {
                return Some(USERNAME_CONSTRAINT);
            }
            if account.email.normalized() == normalized {
                return Some(EMAIL_CONSTRAINT);
            }
        }
        None
    }
}

fn bump(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// Storage held entirely in memory.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
    orders_written: AtomicUsize,
    fail_next_detail_insert: AtomicBool,
    unavailable: AtomicBool,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("storage offline".to_string()));
        }
        self.tables
            .read()
            .map_err(|_| RepositoryError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("storage offline".to_string()));
        }
        self.tables
            .write()
            .map_err(|_| RepositoryError::Unavailable("lock poisoned".to_string()))
    }

    /// Seed a shipping option.
    ///
    /// # Errors
    ///
    /// Returns an error if storage is offline.
    pub fn add_shipping_option(
        &self,
        kind: &str,
        description: &str,
        amount: Amount,
    ) -> Result<ShippingOption, RepositoryError> {
        let mut tables = self.write()?;
        let id = ShippingOptionId::new(bump(&mut tables.next_shipping_option_id));
        let option = ShippingOption {
            id,
            kind: kind.to_string(),
            description: description.to_string(),
            amount,
        };
        tables.shipping_options.insert(id, option.clone());
        Ok(option)
    }

    /// Seed a product.
    ///
    /// # Errors
    ///
    /// Returns an error if storage is offline.
    pub fn add_product(
        &self,
        name: &str,
        description: &str,
        price: Amount,
        image: Vec<u8>,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.write()?;
        let id = ProductId::new(bump(&mut tables.next_product_id));
        let product = Product {
            id,
            name: name.to_string(),
            description: description.to_string(),
            price,
            image,
        };
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    /// Number of orders committed so far.
    #[must_use]
    pub fn orders_written(&self) -> usize {
        self.orders_written.load(Ordering::SeqCst)
    }

    /// Make the next order's first detail insert fail after the parent row
    /// was staged. The next order consumes the flag even if it has no
    /// details, in which case it succeeds.
    pub fn fail_next_detail_insert(&self) {
        self.fail_next_detail_insert.store(true, Ordering::SeqCst);
    }

    /// Toggle whether every operation fails as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

struct MemoryPendingRegistration<'a> {
    storage: &'a MemoryStorage,
    account: Account,
    password_hash: String,
}

#[async_trait]
impl PendingRegistration for MemoryPendingRegistration<'_> {
    fn account(&self) -> &Account {
        &self.account
    }

    async fn commit(self: Box<Self>) -> Result<Account, RepositoryError> {
        let mut tables = self.storage.write()?;
        if let Some(constraint) = tables.conflict_for(&self.account.username, &self.account.email)
        {
            return Err(RepositoryError::Conflict(constraint.to_string()));
        }
        tables.accounts.insert(
            self.account.id,
            (self.account.clone(), self.password_hash),
        );
        Ok(self.account)
    }
}

#[async_trait]
impl AccountStore for MemoryStorage {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.read()?.accounts.get(&id).map(|(a, _)| a.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|(a, _)| a.username == username)
            .map(|(a, _)| a.clone()))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let normalized = email.normalized();
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|(a, _)| a.email.normalized() == normalized)
            .map(|(a, _)| a.clone()))
    }

    async fn credentials_for_username(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|(a, _)| a.username == username)
            .cloned())
    }

    async fn begin_registration<'a>(
        &'a self,
        account: NewAccount,
        password_hash: String,
    ) -> Result<Box<dyn PendingRegistration + 'a>, RepositoryError> {
        let mut tables = self.write()?;
        if let Some(constraint) = tables.conflict_for(&account.username, &account.email) {
            return Err(RepositoryError::Conflict(constraint.to_string()));
        }
        let id = AccountId::new(bump(&mut tables.next_account_id));
        drop(tables);

        Ok(Box::new(MemoryPendingRegistration {
            storage: self,
            account: account.into_account(id, Utc::now()),
            password_hash,
        }))
    }

    async fn confirm_email(&self, id: AccountId) -> Result<bool, RepositoryError> {
        let mut tables = self.write()?;
        let Some((account, _)) = tables.accounts.get_mut(&id) else {
            return Ok(false);
        };
        let changed = !account.email_confirmed;
        account.email_confirmed = true;
        Ok(changed)
    }
}

#[async_trait]
impl CatalogStore for MemoryStorage {
    async fn shipping_options(&self) -> Result<Vec<ShippingOption>, RepositoryError> {
        Ok(self.read()?.shipping_options.values().cloned().collect())
    }

    async fn shipping_option(
        &self,
        id: ShippingOptionId,
    ) -> Result<Option<ShippingOption>, RepositoryError> {
        Ok(self.read()?.shipping_options.get(&id).cloned())
    }

    async fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        Ok(self
            .read()?
            .products
            .values()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderStore for MemoryStorage {
    async fn insert_order(&self, order: NewUserOrder) -> Result<UserOrder, RepositoryError> {
        let mut tables = self.write()?;

        // Stage against a copy of the sequences; only publish on success.
        let mut next_order_id = tables.next_order_id;
        let mut next_detail_id = tables.next_detail_id;
        let order_id = OrderId::new(bump(&mut next_order_id));

        let fail_detail_insert = self.fail_next_detail_insert.swap(false, Ordering::SeqCst);

        let mut details = Vec::with_capacity(order.details.len());
        for detail in order.details {
            if fail_detail_insert {
                return Err(RepositoryError::Unavailable(
                    "detail insert rejected".to_string(),
                ));
            }
            if !tables.products.contains_key(&detail.product_id) {
                return Err(RepositoryError::Conflict("order_detail_product_id_fkey".to_string()));
            }
            details.push(OrderDetail {
                id: OrderDetailId::new(bump(&mut next_detail_id)),
                order_id,
                product_id: detail.product_id,
                quantity: detail.quantity,
                total_price: detail.total_price,
            });
        }

        let stored = UserOrder {
            id: order_id,
            account_id: order.account_id,
            shipping_option_id: order.shipping_option_id,
            details,
            purchase_order_pdf: order.purchase_order_pdf,
            order_total: order.order_total,
            shipping_address: order.shipping_address,
            order_date: order.order_date,
            status: order.status,
        };

        tables.next_order_id = next_order_id;
        tables.next_detail_id = next_detail_id;
        tables.orders.insert(order_id, stored.clone());
        self.orders_written.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn order(&self, id: OrderId) -> Result<Option<UserOrder>, RepositoryError> {
        Ok(self.read()?.orders.get(&id).cloned())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.read().map(|_| ())
    }
}
