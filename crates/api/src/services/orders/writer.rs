//! Persists validated orders.

use std::collections::HashSet;

use chrono::Utc;
use tracing::instrument;

use rockland_core::{OrderStatus, ProductId};

use super::OrderError;
use super::validate::{OrderRejection, ValidatedOrder};
use crate::db::{CatalogStore, OrderStore};
use crate::models::{NewOrderDetail, NewUserOrder, UserOrder};

/// Turns a [`ValidatedOrder`] into a stored [`UserOrder`].
pub struct OrderWriter<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: CatalogStore + OrderStore + ?Sized> OrderWriter<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve every line's product from the catalog, then insert the order
    /// and its details in one transaction.
    ///
    /// Only the product id of a line is trusted. The order is stamped with the
    /// current UTC time and status `New`.
    ///
    /// # Errors
    ///
    /// Returns `OrderRejection::UnknownProduct` if a line names a product not
    /// in the catalog, and `OrderError::Repository` if storage fails (in
    /// which case nothing was written).
    #[instrument(skip(self, order), fields(account_id = %order.account.id, lines = order.details.len()))]
    pub async fn write(&self, order: ValidatedOrder) -> Result<UserOrder, OrderError> {
        let ids: Vec<ProductId> = order
            .details
            .iter()
            .map(|line| line.product_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let known: HashSet<ProductId> = self
            .store
            .products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|product| product.id)
            .collect();

        let details = order
            .details
            .into_iter()
            .map(|line| {
                if known.contains(&line.product_id) {
                    Ok(NewOrderDetail {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        total_price: line.total_price,
                    })
                } else {
                    Err(OrderRejection::UnknownProduct)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stored = self
            .store
            .insert_order(NewUserOrder {
                account_id: order.account.id,
                shipping_option_id: order.shipping_option.id,
                details,
                purchase_order_pdf: order.purchase_order_pdf,
                order_total: order.order_total,
                shipping_address: order.shipping_address,
                order_date: Utc::now(),
                status: OrderStatus::New,
            })
            .await?;

        tracing::info!(order_id = %stored.id, total = %stored.order_total, "Order created");
        Ok(stored)
    }
}
