//! Catalog reads for the ordering client.

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{ProductListing, ShippingOption};

/// All shipping options, in storage order.
///
/// # Errors
///
/// Propagates storage failures; no partial list is returned.
pub async fn shipping_options<S: CatalogStore + ?Sized>(
    store: &S,
) -> Result<Vec<ShippingOption>, RepositoryError> {
    store.shipping_options().await
}

/// All products with images base64-encoded for transport.
///
/// # Errors
///
/// Propagates storage failures; no partial list is returned.
pub async fn product_listings<S: CatalogStore + ?Sized>(
    store: &S,
) -> Result<Vec<ProductListing>, RepositoryError> {
    let products = store.products().await?;
    Ok(products.into_iter().map(ProductListing::from).collect())
}
