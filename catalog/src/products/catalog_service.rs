use std::sync::Arc;

use common_redis::Client as RedisClient;
use tracing::{field, instrument, Span};

use crate::{
    api::errors::CatalogError,
    cache::{
        product_cache_key, CachePolicy, CacheResult, InvalidationOutcome, ProductCache,
        PRODUCTS_LIST_CACHE_KEY,
    },
    products::{
        product_models::{Product, ProductId, ProductPayload},
        product_operations::ProductStore,
    },
};

/// Product operations over the record store, fronted by the cache.
///
/// Reads are cache-aside. Writes go to the record store first and only
/// invalidate cache keys once the store has acknowledged the change; a failed
/// or rejected write leaves the cache untouched.
pub struct CatalogService {
    store: Arc<dyn ProductStore + Send + Sync>,
    cache: ProductCache,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn ProductStore + Send + Sync>,
        redis: Arc<dyn RedisClient + Send + Sync>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            store,
            cache: ProductCache::new(redis, policy),
        }
    }

    #[instrument(
        skip(self),
        fields(cache_source = field::Empty, cache_hit = field::Empty, cache_degraded = field::Empty)
    )]
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        let result = self
            .cache
            .get_or_load(PRODUCTS_LIST_CACHE_KEY, || async {
                self.store.list().await.map(Some)
            })
            .await?;

        record_read(&result);
        Ok(result.value.unwrap_or_default())
    }

    #[instrument(
        skip(self),
        fields(cache_source = field::Empty, cache_hit = field::Empty, cache_degraded = field::Empty)
    )]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let result = self
            .cache
            .get_or_load(&product_cache_key(id), || async {
                self.store.get_by_id(id).await
            })
            .await?;

        record_read(&result);
        result.value.ok_or(CatalogError::NotFound)
    }

    #[instrument(skip(self, payload), fields(id = field::Empty, invalidation = field::Empty))]
    pub async fn create_product(&self, payload: ProductPayload) -> Result<Product, CatalogError> {
        let fields = payload.validate()?;
        let product = self.store.insert(&fields).await?;

        Span::current().record("id", product.id);
        let outcome = self
            .cache
            .invalidate(&[PRODUCTS_LIST_CACHE_KEY.to_string()])
            .await;
        record_invalidation(outcome);

        Ok(product)
    }

    #[instrument(skip(self, payload), fields(invalidation = field::Empty))]
    pub async fn update_product(
        &self,
        id: ProductId,
        payload: ProductPayload,
    ) -> Result<Product, CatalogError> {
        let fields = payload.validate()?;
        let product = self
            .store
            .update(id, &fields)
            .await?
            .ok_or(CatalogError::NotFound)?;

        let outcome = self
            .cache
            .invalidate(&[PRODUCTS_LIST_CACHE_KEY.to_string(), product_cache_key(id)])
            .await;
        record_invalidation(outcome);

        Ok(product)
    }

    #[instrument(skip(self), fields(invalidation = field::Empty))]
    pub async fn delete_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let product = self
            .store
            .delete(id)
            .await?
            .ok_or(CatalogError::NotFound)?;

        let outcome = self
            .cache
            .invalidate(&[PRODUCTS_LIST_CACHE_KEY.to_string(), product_cache_key(id)])
            .await;
        record_invalidation(outcome);

        Ok(product)
    }

    pub async fn ready(&self) -> Result<(), CatalogError> {
        self.store.ping().await
    }
}

fn record_read<V>(result: &CacheResult<V>) {
    let span = Span::current();
    span.record("cache_source", field::display(result.source));
    span.record("cache_hit", result.was_cached());
    span.record("cache_degraded", result.is_degraded());
}

fn record_invalidation(outcome: InvalidationOutcome) {
    Span::current().record("invalidation", field::display(outcome));
}
