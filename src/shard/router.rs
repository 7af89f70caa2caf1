use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::{route_for_create, Route, Shard};
use crate::error::{AppError, AppResult};
use crate::storage::{NewProduct, Product, ProductPatch, StorageBackend};

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(Product, Shard),
    /// The patch carried no fields; nothing was written.
    Unchanged(Shard),
}

/// Routes creates by name range and fans shard-agnostic operations out over
/// both stores, always Shard1 first. A store error on any probe aborts the
/// operation; partial results are never returned.
#[derive(Clone)]
pub struct ShardRouter {
    shard1: Arc<dyn StorageBackend>,
    shard2: Arc<dyn StorageBackend>,
}

fn not_found(id: &str) -> AppError {
    AppError::not_found("product_not_found".to_string(), format!("product '{}' not found", id))
}

fn check_id(id: &str) -> AppResult<()> {
    if id.trim().is_empty() {
        return Err(AppError::validation("missing_field", "product id is required"));
    }
    Ok(())
}

impl ShardRouter {
    pub fn new(shard1: Arc<dyn StorageBackend>, shard2: Arc<dyn StorageBackend>) -> Self {
        Self { shard1, shard2 }
    }

    pub fn backend(&self, shard: Shard) -> &dyn StorageBackend {
        match shard {
            Shard::Shard1 => self.shard1.as_ref(),
            Shard::Shard2 => self.shard2.as_ref(),
        }
    }

    pub fn create(&self, product: NewProduct) -> AppResult<(Product, Route)> {
        let route = route_for_create(&product.name)?;
        let store = self.backend(route.shard);
        let row = store.insert(product, Utc::now())?;
        debug!(target: "shard", id = %row.id, name = %row.name, route = %route, store = store.name(), "product created");
        Ok((row, route))
    }

    pub fn locate(&self, id: &str) -> AppResult<(Product, Shard)> {
        check_id(id)?;
        for shard in Shard::ALL {
            if let Some(row) = self.backend(shard).find_by_id(id)? {
                debug!(target: "shard", id, %shard, "located");
                return Ok((row, shard));
            }
        }
        Err(not_found(id))
    }

    /// Delete from the first shard holding `id`; the other shard is left alone.
    pub fn delete(&self, id: &str) -> AppResult<Shard> {
        check_id(id)?;
        for shard in Shard::ALL {
            if self.backend(shard).delete(id)? {
                debug!(target: "shard", id, %shard, "deleted");
                return Ok(shard);
            }
        }
        Err(not_found(id))
    }

    pub fn list_all(&self) -> AppResult<Vec<(Product, Shard)>> {
        let mut out = Vec::new();
        for shard in Shard::ALL {
            out.extend(self.backend(shard).list_all()?.into_iter().map(|p| (p, shard)));
        }
        Ok(out)
    }

    /// Patch a record in place, in whichever shard holds it.
    ///
    /// A rename never relocates: a product created as "Orange" in Shard2 stays
    /// in Shard2 after being renamed "Avocado".
    pub fn update(&self, id: &str, patch: &ProductPatch) -> AppResult<UpdateOutcome> {
        if matches!(patch.name.as_deref(), Some("")) {
            return Err(AppError::validation("invalid_field", "product name must not be empty"));
        }
        let (mut row, shard) = self.locate(id)?;
        if patch.is_empty() {
            return Ok(UpdateOutcome::Unchanged(shard));
        }
        patch.apply(&mut row, Utc::now());
        if !self.backend(shard).update(&row)? {
            // Removed between probe and write.
            return Err(not_found(id));
        }
        if let Some(name) = &patch.name {
            if route_for_create(name).map(|r| r.shard).ok() != Some(shard) {
                debug!(target: "shard", id, %shard, name = %name, "renamed across shard boundary; record stays put");
            }
        }
        Ok(UpdateOutcome::Updated(row, shard))
    }

    pub fn shard_counts(&self) -> AppResult<Vec<(Shard, usize)>> {
        let mut out = Vec::with_capacity(Shard::ALL.len());
        for shard in Shard::ALL {
            out.push((shard, self.backend(shard).count()?));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{IdScheme, MemoryBackend, StoreError, StoreResult};
    use chrono::DateTime;

    fn router() -> (ShardRouter, MemoryBackend, MemoryBackend) {
        let s1 = MemoryBackend::with_ids("shard1", IdScheme::Sequential);
        let s2 = MemoryBackend::with_ids("shard2", IdScheme::Sequential);
        (ShardRouter::new(Arc::new(s1.clone()), Arc::new(s2.clone())), s1, s2)
    }

    struct Down;

    impl StorageBackend for Down {
        fn name(&self) -> &str { "down" }
        fn insert(&self, _: NewProduct, _: DateTime<Utc>) -> StoreResult<Product> { Err(self.err()) }
        fn find_by_id(&self, _: &str) -> StoreResult<Option<Product>> { Err(self.err()) }
        fn update(&self, _: &Product) -> StoreResult<bool> { Err(self.err()) }
        fn delete(&self, _: &str) -> StoreResult<bool> { Err(self.err()) }
        fn list_all(&self) -> StoreResult<Vec<Product>> { Err(self.err()) }
    }

    impl Down {
        fn err(&self) -> StoreError { StoreError::Unavailable { store: "down".into(), reason: "connection refused".into() } }
    }

    #[test]
    fn create_lands_in_routed_shard() {
        let (r, s1, s2) = router();
        let (p, route) = r.create(NewProduct::new("Orange", 1.8, 150)).unwrap();
        assert_eq!(route.label(), "Shard2 (N-Z)");
        assert!(s2.find_by_id(&p.id).unwrap().is_some());
        assert!(s1.list_all().unwrap().is_empty());

        let (_, route) = r.create(NewProduct::new("42 Widgets", 1.0, 1)).unwrap();
        assert_eq!(route.label(), "Shard1 (default)");
        assert_eq!(s1.count().unwrap(), 1);
    }

    #[test]
    fn create_rejects_empty_name() {
        let (r, s1, s2) = router();
        assert_eq!(r.create(NewProduct::new("", 1.0, 1)).unwrap_err().http_status(), 400);
        assert_eq!(s1.count().unwrap() + s2.count().unwrap(), 0);
    }

    #[test]
    fn colliding_ids_resolve_to_shard1_first() {
        let (r, s1, s2) = router();
        // Both shards mint "1" for their first record.
        r.create(NewProduct::new("Apple", 1.0, 1)).unwrap();
        r.create(NewProduct::new("Zucchini", 2.0, 2)).unwrap();

        let (p, shard) = r.locate("1").unwrap();
        assert_eq!((p.name.as_str(), shard), ("Apple", Shard::Shard1));

        assert_eq!(r.delete("1").unwrap(), Shard::Shard1);
        assert!(s1.find_by_id("1").unwrap().is_none());
        assert_eq!(s2.find_by_id("1").unwrap().unwrap().name, "Zucchini");

        // With Shard1's copy gone the probe falls through to Shard2.
        assert_eq!(r.locate("1").unwrap().1, Shard::Shard2);
        assert_eq!(r.delete("1").unwrap(), Shard::Shard2);
        assert_eq!(r.delete("1").unwrap_err().http_status(), 404);
    }

    #[test]
    fn list_all_orders_shard1_before_shard2() {
        let (r, _, _) = router();
        for n in ["Zebra", "Apple", "Nut", "Mango"] {
            r.create(NewProduct::new(n, 1.0, 1)).unwrap();
        }
        let listed: Vec<_> = r.list_all().unwrap().into_iter().map(|(p, s)| (p.name, s)).collect();
        assert_eq!(
            listed,
            vec![
                ("Apple".to_string(), Shard::Shard1),
                ("Mango".to_string(), Shard::Shard1),
                ("Zebra".to_string(), Shard::Shard2),
                ("Nut".to_string(), Shard::Shard2),
            ]
        );
    }

    #[test]
    fn rename_across_boundary_does_not_relocate() {
        let (r, s1, s2) = router();
        let (orig, _) = r.create(NewProduct::new("Orange", 1.8, 150)).unwrap();
        let patch = ProductPatch { name: Some("Avocado".into()), ..Default::default() };
        match r.update(&orig.id, &patch).unwrap() {
            UpdateOutcome::Updated(p, shard) => {
                assert_eq!(shard, Shard::Shard2);
                assert_eq!(p.name, "Avocado");
                assert_eq!(p.price, 1.8);
                assert!(p.updated_at >= orig.updated_at);
                assert_eq!(p.created_at, orig.created_at);
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert!(s1.list_all().unwrap().is_empty());
        assert_eq!(s2.find_by_id(&orig.id).unwrap().unwrap().name, "Avocado");
        let (p, shard) = r.locate(&orig.id).unwrap();
        assert_eq!((p.name.as_str(), shard), ("Avocado", Shard::Shard2));
    }

    #[test]
    fn empty_patch_is_a_noop_but_still_requires_a_hit() {
        let (r, s1, _) = router();
        let (p, _) = r.create(NewProduct::new("Banana", 1.0, 1)).unwrap();
        assert_eq!(r.update(&p.id, &ProductPatch::default()).unwrap(), UpdateOutcome::Unchanged(Shard::Shard1));
        assert_eq!(s1.find_by_id(&p.id).unwrap().unwrap().updated_at, p.updated_at);
        assert_eq!(r.update("999", &ProductPatch::default()).unwrap_err().http_status(), 404);
    }

    #[test]
    fn update_rejects_empty_name() {
        let (r, _, _) = router();
        let (p, _) = r.create(NewProduct::new("Banana", 1.0, 1)).unwrap();
        let patch = ProductPatch { name: Some(String::new()), ..Default::default() };
        assert_eq!(r.update(&p.id, &patch).unwrap_err().http_status(), 400);
    }

    #[test]
    fn blank_id_is_validation_error() {
        let (r, _, _) = router();
        assert_eq!(r.locate("  ").unwrap_err().http_status(), 400);
        assert_eq!(r.delete("").unwrap_err().http_status(), 400);
    }

    #[test]
    fn shard_failure_aborts_fan_out() {
        let healthy = MemoryBackend::new("shard1");
        let r = ShardRouter::new(Arc::new(healthy.clone()), Arc::new(Down));
        let (p, _) = r.create(NewProduct::new("Apple", 1.0, 1)).unwrap();

        // Hit in Shard1 never consults Shard2.
        assert_eq!(r.locate(&p.id).unwrap().1, Shard::Shard1);
        // Miss in Shard1 hits the broken Shard2.
        let err = r.locate("missing").unwrap_err();
        assert_eq!(err.http_status(), 500);
        assert!(err.message().contains("connection refused"));
        // Listing needs both shards.
        assert_eq!(r.list_all().unwrap_err().http_status(), 500);
        assert_eq!(r.create(NewProduct::new("Zebra", 1.0, 1)).unwrap_err().http_status(), 500);
    }

    #[test]
    fn counts_per_shard() {
        let (r, _, _) = router();
        for n in ["Apple", "Berry", "Nut"] {
            r.create(NewProduct::new(n, 1.0, 1)).unwrap();
        }
        assert_eq!(r.shard_counts().unwrap(), vec![(Shard::Shard1, 2), (Shard::Shard2, 1)]);
    }
}
