//! Catalog types: shipping options and products.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;

use rockland_core::{Amount, ProductId, ShippingOptionId};

/// A flat-rate shipping choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub description: String,
    pub amount: Amount,
}

/// A catalog product with its raw image bytes.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Amount,
    pub image: Vec<u8>,
}

/// Product as sent to clients, with the image base64-encoded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Amount,
    pub image: String,
}

impl From<Product> for ProductListing {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            image: STANDARD.encode(&product.image),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_encodes_image() {
        let product = Product {
            id: ProductId::new(3),
            name: "Widget".to_string(),
            description: "A widget".to_string(),
            price: "4.50".parse().unwrap(),
            image: vec![0x89, b'P', b'N', b'G'],
        };
        let listing = ProductListing::from(product);
        assert_eq!(listing.image, "iVBORw==");

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["price"], "4.50");
        assert_eq!(json["id"], 3);
    }

    #[test]
    fn test_shipping_option_serializes_type_field() {
        let option = ShippingOption {
            id: ShippingOptionId::new(1),
            kind: "Ground".to_string(),
            description: "3-5 business days".to_string(),
            amount: "10.00".parse().unwrap(),
        };
        let json = serde_json::to_value(&option).unwrap();
        assert_eq!(json["type"], "Ground");
        assert_eq!(json["amount"], "10.00");
    }
}
