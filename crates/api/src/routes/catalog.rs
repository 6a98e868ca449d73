//! Catalog route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, Operation, Result};
use crate::models::{ProductListing, ShippingOption};
use crate::services::catalog;
use crate::state::AppState;

/// List every shipping option.
#[instrument(skip(state))]
pub async fn shipping_options(State(state): State<AppState>) -> Result<Json<Vec<ShippingOption>>> {
    let options = catalog::shipping_options(state.storage())
        .await
        .map_err(|e| AppError::internal(Operation::ShippingOptions, e))?;
    Ok(Json(options))
}

/// List every product with its image base64-encoded.
#[instrument(skip(state))]
pub async fn product_list(State(state): State<AppState>) -> Result<Json<Vec<ProductListing>>> {
    let products = catalog::product_listings(state.storage())
        .await
        .map_err(|e| AppError::internal(Operation::Products, e))?;
    Ok(Json(products))
}
