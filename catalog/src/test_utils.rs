use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    api::errors::CatalogError,
    products::{
        product_models::{Product, ProductFields, ProductId, ProductPayload},
        product_operations::ProductStore,
    },
};

#[derive(Default)]
struct MemoryState {
    rows: BTreeMap<ProductId, Product>,
    last_id: ProductId,
}

/// In-memory record store with call counters and a switch that makes every
/// call fail the way an unreachable database does. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryProductStore {
    state: Arc<Mutex<MemoryState>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_available(&self) -> Result<(), CatalogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CatalogError::StoreUnavailable(
                "connection refused".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert a product directly, bypassing the counters.
    pub fn seed(&self, payload: ProductPayload) -> Product {
        let fields = payload.validate().expect("seed payload must be valid");
        self.insert_row(&fields)
    }

    /// Number of `list` and `get_by_id` calls that reached the store.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn insert_row(&self, fields: &ProductFields) -> Product {
        let mut state = self.lock();
        state.last_id += 1;
        let product = to_product(state.last_id, fields);
        state.rows.insert(product.id, product.clone());
        product
    }
}

fn to_product(id: ProductId, fields: &ProductFields) -> Product {
    Product {
        id,
        name: fields.name.clone(),
        description: fields.description.clone(),
        price: fields.price,
        category: fields.category.clone(),
        image_url: fields.image_url.clone(),
        stock_quantity: fields.stock_quantity,
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.lock().rows.values().cloned().collect())
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.lock().rows.get(&id).cloned())
    }

    async fn insert(&self, fields: &ProductFields) -> Result<Product, CatalogError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.insert_row(fields))
    }

    async fn update(
        &self,
        id: ProductId,
        fields: &ProductFields,
    ) -> Result<Option<Product>, CatalogError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut state = self.lock();
        Ok(state.rows.get_mut(&id).map(|row| {
            *row = to_product(id, fields);
            row.clone()
        }))
    }

    async fn delete(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.lock().rows.remove(&id))
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        self.check_available()
    }
}

/// A payload with the required fields set. `price` is a decimal string.
pub fn payload(name: &str, price: &str, stock_quantity: i64) -> ProductPayload {
    ProductPayload {
        name: Some(name.to_string()),
        price: Some(Decimal::from_str(price).expect("test price must be a decimal")),
        stock_quantity: Some(stock_quantity),
        ..ProductPayload::default()
    }
}
