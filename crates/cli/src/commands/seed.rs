//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! shipping_options:
//!   - type: Ground
//!     description: 3-5 business days
//!     amount: "10.00"
//! products:
//!   - name: Widget
//!     description: A widget
//!     price: "50.00"
//!     image: images/widget.png   # optional, relative to the catalog file
//! ```
//!
//! Rows are matched by shipping option type and product name; existing rows
//! are left alone, so seeding twice is harmless. Everything is inserted in
//! one transaction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info};

use rockland_api::db;
use rockland_core::Amount;

/// Errors from seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Missing environment variable: ORDER_API_DATABASE_URL or DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Catalog file contents.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub shipping_options: Vec<ShippingOptionSeed>,
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
pub struct ShippingOptionSeed {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Amount,
    /// Image file, relative to the catalog file.
    pub image: Option<PathBuf>,
}

/// Totals reported after a seed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Seed shipping options and products from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or the database rejects the inserts. Nothing is written on error.
pub async fn catalog(path: &Path, dry_run: bool) -> Result<(), SeedError> {
    info!(path = %path.display(), "Loading catalog");
    let content = read(path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    info!(
        shipping_options = catalog.shipping_options.len(),
        products = catalog.products.len(),
        "Catalog validated"
    );
    if dry_run {
        return Ok(());
    }

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut images = Vec::with_capacity(catalog.products.len());
    for product in &catalog.products {
        let image = match &product.image {
            Some(relative) => {
                let full = base.join(relative);
                tokio::fs::read(&full)
                    .await
                    .map_err(|source| SeedError::Io { path: full, source })?
            }
            None => Vec::new(),
        };
        images.push(image);
    }

    let database_url = super::database_url().ok_or(SeedError::MissingDatabaseUrl)?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for option in &catalog.shipping_options {
        let result = sqlx::query(
            "INSERT INTO shipping_option (type, description, amount)
             SELECT $1, $2, $3
             WHERE NOT EXISTS (SELECT 1 FROM shipping_option WHERE type = $1)",
        )
        .bind(&option.kind)
        .bind(&option.description)
        .bind(option.amount)
        .execute(&mut *tx)
        .await?;
        summary.record(result.rows_affected());
    }

    for (product, image) in catalog.products.iter().zip(images) {
        let result = sqlx::query(
            "INSERT INTO product (name, description, price, image)
             SELECT $1, $2, $3, $4
             WHERE NOT EXISTS (SELECT 1 FROM product WHERE name = $1)",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(image)
        .execute(&mut *tx)
        .await?;
        summary.record(result.rows_affected());
    }

    tx.commit().await?;

    info!("Seeding complete!");
    info!("  Rows inserted: {}", summary.inserted);
    info!("  Rows skipped (already exist): {}", summary.skipped);
    Ok(())
}

impl SeedSummary {
    const fn record(&mut self, rows_affected: u64) {
        if rows_affected == 0 {
            self.skipped += 1;
        } else {
            self.inserted += 1;
        }
    }
}

async fn read(path: &Path) -> Result<String, SeedError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Problems that would make the catalog unusable.
fn validate(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();

    let mut kinds = HashSet::new();
    for option in &catalog.shipping_options {
        if option.kind.trim().is_empty() {
            errors.push("shipping option with an empty type".to_string());
        } else if !kinds.insert(option.kind.as_str()) {
            errors.push(format!("duplicate shipping option '{}'", option.kind));
        }
        if option.amount.is_negative() {
            errors.push(format!("shipping option '{}' has a negative amount", option.kind));
        }
    }

    let mut names = HashSet::new();
    for product in &catalog.products {
        if product.name.trim().is_empty() {
            errors.push("product with an empty name".to_string());
        } else if !names.insert(product.name.as_str()) {
            errors.push(format!("duplicate product '{}'", product.name));
        }
        if product.price.is_negative() {
            errors.push(format!("product '{}' has a negative price", product.name));
        }
    }

    errors
}
