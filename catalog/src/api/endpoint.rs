use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    api::errors::CatalogError,
    products::product_models::{Product, ProductId, ProductPayload},
    router,
};

pub const DELETED_MESSAGE: &str = "Product deleted successfully.";

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
    #[serde(rename = "deletedProduct")]
    pub deleted_product: Product,
}

/// A path id that is not an integer cannot name a product.
fn parse_product_id(raw: &str) -> Result<ProductId, CatalogError> {
    raw.parse::<ProductId>().map_err(|_| CatalogError::NotFound)
}

pub async fn list_products(
    State(state): State<router::State>,
) -> Result<Json<Vec<Product>>, CatalogError> {
    Ok(Json(state.catalog.list_products().await?))
}

pub async fn get_product(
    State(state): State<router::State>,
    Path(id): Path<String>,
) -> Result<Json<Product>, CatalogError> {
    let id = parse_product_id(&id)?;
    Ok(Json(state.catalog.get_product(id).await?))
}

pub async fn create_product(
    State(state): State<router::State>,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), CatalogError> {
    let Json(payload) = payload?;
    let product = state.catalog.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<router::State>,
    Path(id): Path<String>,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<Json<Product>, CatalogError> {
    let id = parse_product_id(&id)?;
    let Json(payload) = payload?;
    Ok(Json(state.catalog.update_product(id, payload).await?))
}

pub async fn delete_product(
    State(state): State<router::State>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, CatalogError> {
    let id = parse_product_id(&id)?;
    let deleted_product = state.catalog.delete_product(id).await?;
    Ok(Json(DeleteResponse {
        message: DELETED_MESSAGE,
        deleted_product,
    }))
}
