use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    api::errors::CatalogError,
    database::get_connection_with_metrics,
    metrics::{
        consts::{DB_PRODUCT_READS_COUNTER, DB_PRODUCT_WRITES_COUNTER},
        utils::inc,
    },
    products::product_models::{Product, ProductFields, ProductId},
};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category, image_url, stock_quantity";

/// The record store for products. Every operation is a single atomic
/// statement. Missing rows are `Ok(None)`, not errors.
#[async_trait]
pub trait ProductStore {
    /// All products ordered by id ascending.
    async fn list(&self) -> Result<Vec<Product>, CatalogError>;

    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, CatalogError>;

    async fn insert(&self, fields: &ProductFields) -> Result<Product, CatalogError>;

    /// Replace every mutable column of the row.
    async fn update(
        &self,
        id: ProductId,
        fields: &ProductFields,
    ) -> Result<Option<Product>, CatalogError>;

    /// Returns the deleted row.
    async fn delete(&self, id: ProductId) -> Result<Option<Product>, CatalogError>;

    /// Round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), CatalogError>;
}

pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn count_read(operation: &str) {
    inc(
        DB_PRODUCT_READS_COUNTER,
        &[("operation".to_string(), operation.to_string())],
        1,
    );
}

fn count_write(operation: &str) {
    inc(
        DB_PRODUCT_WRITES_COUNTER,
        &[("operation".to_string(), operation.to_string())],
        1,
    );
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        let mut conn = get_connection_with_metrics(&self.pool, "list_products").await?;
        count_read("list_products");

        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC");
        let rows = sqlx::query_as::<_, Product>(&query)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows)
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let mut conn = get_connection_with_metrics(&self.pool, "get_product").await?;
        count_read("get_product");

        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row)
    }

    async fn insert(&self, fields: &ProductFields) -> Result<Product, CatalogError> {
        let mut conn = get_connection_with_metrics(&self.pool, "create_product").await?;
        count_write("create_product");

        let query = format!(
            "INSERT INTO products (name, description, price, category, image_url, stock_quantity) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Product>(&query)
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(fields.price)
            .bind(&fields.category)
            .bind(&fields.image_url)
            .bind(fields.stock_quantity)
            .fetch_one(&mut *conn)
            .await?;

        Ok(row)
    }

    async fn update(
        &self,
        id: ProductId,
        fields: &ProductFields,
    ) -> Result<Option<Product>, CatalogError> {
        let mut conn = get_connection_with_metrics(&self.pool, "update_product").await?;
        count_write("update_product");

        let query = format!(
            "UPDATE products \
             SET name = $1, description = $2, price = $3, category = $4, image_url = $5, stock_quantity = $6 \
             WHERE id = $7 RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Product>(&query)
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(fields.price)
            .bind(&fields.category)
            .bind(&fields.image_url)
            .bind(fields.stock_quantity)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row)
    }

    async fn delete(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let mut conn = get_connection_with_metrics(&self.pool, "delete_product").await?;
        count_write("delete_product");

        let query = format!("DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}");
        let row = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row)
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        let mut conn = get_connection_with_metrics(&self.pool, "readiness").await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }
}
