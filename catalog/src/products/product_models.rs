use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::errors::{CatalogError, REQUIRED_FIELDS_MESSAGE};

pub type ProductId = i64;

/// A product row. `price` is NUMERIC in postgres and a plain JSON number on
/// the wire and in the cache.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
}

/// Request body for create and update. Everything is optional here so that a
/// missing field is reported as a validation error rather than a parse error.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
}

/// A validated product body, ready to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
}

impl ProductPayload {
    pub fn validate(self) -> Result<ProductFields, CatalogError> {
        let (Some(name), Some(price), Some(stock_quantity)) =
            (self.name, self.price, self.stock_quantity)
        else {
            return Err(CatalogError::ValidationError(
                REQUIRED_FIELDS_MESSAGE.to_string(),
            ));
        };

        if name.trim().is_empty() {
            return Err(CatalogError::ValidationError(
                "Name must not be empty.".to_string(),
            ));
        }
        if price.is_sign_negative() && !price.is_zero() {
            return Err(CatalogError::ValidationError(
                "Price must be a non-negative number.".to_string(),
            ));
        }
        if stock_quantity < 0 {
            return Err(CatalogError::ValidationError(
                "Stock quantity must be a non-negative integer.".to_string(),
            ));
        }
        let stock_quantity = i32::try_from(stock_quantity).map_err(|_| {
            CatalogError::ValidationError("Stock quantity is too large.".to_string())
        })?;

        Ok(ProductFields {
            name,
            description: self.description,
            price,
            category: self.category,
            image_url: self.image_url,
            stock_quantity,
        })
    }
}
