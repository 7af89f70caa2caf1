use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{IdScheme, NewProduct, Product, StorageBackend, StoreResult};

#[derive(Default)]
struct Inner {
    seq: u64,
    // Insertion order is the store-native listing order.
    order: Vec<String>,
    rows: HashMap<String, Product>,
}

/// A single in-memory product store.
#[derive(Clone)]
pub struct MemoryBackend {
    name: String,
    ids: IdScheme,
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_ids(name, IdScheme::default())
    }

    pub fn with_ids(name: impl Into<String>, ids: IdScheme) -> Self {
        Self { name: name.into(), ids, inner: Arc::new(RwLock::new(Inner::default())) }
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str { &self.name }

    fn insert(&self, product: NewProduct, created_at: DateTime<Utc>) -> StoreResult<Product> {
        let mut g = self.inner.write();
        g.seq += 1;
        let id = self.ids.mint(g.seq);
        let row = product.into_product(id.clone(), created_at);
        g.order.push(id.clone());
        g.rows.insert(id, row.clone());
        Ok(row)
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.inner.read().rows.get(id).cloned())
    }

    fn update(&self, product: &Product) -> StoreResult<bool> {
        let mut g = self.inner.write();
        match g.rows.get_mut(&product.id) {
            Some(slot) => { *slot = product.clone(); Ok(true) }
            None => Ok(false),
        }
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut g = self.inner.write();
        if g.rows.remove(id).is_none() { return Ok(false); }
        g.order.retain(|k| k != id);
        Ok(true)
    }

    fn list_all(&self) -> StoreResult<Vec<Product>> {
        let g = self.inner.read();
        Ok(g.order.iter().filter_map(|id| g.rows.get(id).cloned()).collect())
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.inner.read().rows.len())
    }
}
