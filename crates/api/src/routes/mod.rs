//! HTTP route handlers for the order API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (storage ping)
//!
//! # Accounts
//! POST /login                  - Username + password for a token
//! POST /register               - Create account, email confirmation link
//! GET  /confirm-email          - Confirm address (?token=&email=)
//! GET  /timezones              - Host time zones
//!
//! # Catalog
//! GET  /shipping-options       - Shipping options
//! GET  /product-list           - Products with base64 images
//!
//! # Orders (requires bearer token)
//! POST /create-order           - Validate and persist an order
//! ```

pub mod auth;
pub mod catalog;
pub mod health;
pub mod orders;
pub mod timezones;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Slack on top of the base64-inflated PDF for the rest of the order JSON.
const ORDER_BODY_OVERHEAD: usize = 64 * 1024;

/// Create the main routes router.
///
/// `file_size_limit` is the purchase order ceiling in decoded bytes; the
/// order route's body limit is sized so that the PDF check, not the body
/// limit, rejects oversized uploads.
pub fn routes(file_size_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/confirm-email", get(auth::confirm_email))
        .route("/timezones", get(timezones::timezones))
        .route("/shipping-options", get(catalog::shipping_options))
        .route("/product-list", get(catalog::product_list))
        .route(
            "/create-order",
            post(orders::create).layer(DefaultBodyLimit::max(order_body_limit(file_size_limit))),
        )
}

const fn order_body_limit(file_size_limit: usize) -> usize {
    file_size_limit
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(ORDER_BODY_OVERHEAD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_body_limit_covers_encoded_pdf() {
        let limit = 2_097_152;
        assert!(order_body_limit(limit) > limit / 3 * 4);
        assert_eq!(order_body_limit(usize::MAX), usize::MAX);
    }
}
