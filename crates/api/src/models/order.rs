//! Order types.
//!
//! [`OrderSubmission`] is what a client posts; it is deliberately lenient
//! (missing fields deserialize to empty values) so that validation, not JSON
//! parsing, decides which reason a rejected order gets. [`NewUserOrder`] is
//! what the writer hands to storage and [`UserOrder`] is what comes back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rockland_core::{
    AccountId, Amount, OrderDetailId, OrderId, OrderStatus, ProductId, ShippingOptionId,
};

/// An order as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderSubmission {
    pub details: Vec<OrderLineSubmission>,
    /// Base64-encoded purchase order PDF.
    #[serde(rename = "purchaseOrderPDF", alias = "purchaseOrderPdf")]
    pub purchase_order_pdf: Option<String>,
    pub order_total: Amount,
    pub shipping_address1: Option<String>,
    pub shipping_address2: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_postal_code: Option<String>,
    pub shipping_option_id: Option<ShippingOptionId>,
}

/// One submitted line item. Only the product id is trusted; any product
/// payload a client embeds alongside it is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineSubmission {
    pub product_id: ProductId,
    pub quantity: i32,
    pub total_price: Amount,
}

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// A line item ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderDetail {
    pub product_id: ProductId,
    pub quantity: i32,
    pub total_price: Amount,
}

/// An order ready to be persisted in one transaction.
#[derive(Debug, Clone)]
pub struct NewUserOrder {
    pub account_id: AccountId,
    pub shipping_option_id: ShippingOptionId,
    pub details: Vec<NewOrderDetail>,
    pub purchase_order_pdf: Vec<u8>,
    pub order_total: Amount,
    pub shipping_address: ShippingAddress,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
}

/// A persisted line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: OrderDetailId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub total_price: Amount,
}

/// A persisted order with its line items.
#[derive(Debug, Clone)]
pub struct UserOrder {
    pub id: OrderId,
    pub account_id: AccountId,
    pub shipping_option_id: ShippingOptionId,
    pub details: Vec<OrderDetail>,
    pub purchase_order_pdf: Vec<u8>,
    pub order_total: Amount,
    pub shipping_address: ShippingAddress,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
}
