//! JSON-document stores. Each call loads the document, mutates it and writes it
//! back through a temp file + rename, so a half-written file is never observed.
//! A process-local mutex serializes read-modify-write within one server; there is
//! no cross-process locking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{IdScheme, NewProduct, Product, StorageBackend, StoreError, StoreResult};

/// A typed JSON document on disk. A missing file reads as `T::default()`.
pub(crate) struct JsonFile<T> {
    store: String,
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    _doc: std::marker::PhantomData<fn() -> T>,
}

impl<T> Clone for JsonFile<T> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), path: self.path.clone(), lock: self.lock.clone(), _doc: std::marker::PhantomData }
    }
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub(crate) fn new(store: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { store: store.into(), path: path.into(), lock: Arc::new(Mutex::new(())), _doc: std::marker::PhantomData }
    }

    pub(crate) fn path(&self) -> &Path { &self.path }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { store: self.store.clone(), path: self.path.clone(), source }
    }

    fn load(&self) -> StoreResult<T> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => Ok(T::default()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| StoreError::Corrupt { store: self.store.clone(), path: self.path.clone(), source }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn save(&self, doc: &T) -> StoreResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
            }
        }
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|source| StoreError::Corrupt { store: self.store.clone(), path: self.path.clone(), source })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&T) -> R) -> StoreResult<R> {
        let _g = self.lock.lock();
        let doc = self.load()?;
        Ok(f(&doc))
    }

    /// Load, mutate, and persist only when `f` reports a change.
    pub(crate) fn modify<R>(&self, f: impl FnOnce(&mut T) -> (R, bool)) -> StoreResult<R> {
        let _g = self.lock.lock();
        let mut doc = self.load()?;
        let (out, dirty) = f(&mut doc);
        if dirty { self.save(&doc)?; }
        Ok(out)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ShardDocument {
    #[serde(default)]
    next_seq: u64,
    #[serde(default)]
    products: Vec<Product>,
}

/// A product shard persisted as a JSON document.
#[derive(Clone)]
pub struct FileBackend {
    name: String,
    ids: IdScheme,
    doc: JsonFile<ShardDocument>,
}

impl FileBackend {
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::open_with_ids(name, path, IdScheme::default())
    }

    pub fn open_with_ids(name: impl Into<String>, path: impl Into<PathBuf>, ids: IdScheme) -> Self {
        let name = name.into();
        Self { doc: JsonFile::new(name.clone(), path), name, ids }
    }

    pub fn path(&self) -> &Path { self.doc.path() }
}

impl StorageBackend for FileBackend {
    fn name(&self) -> &str { &self.name }

    fn insert(&self, product: NewProduct, created_at: DateTime<Utc>) -> StoreResult<Product> {
        let ids = self.ids;
        self.doc.modify(|d| {
            d.next_seq += 1;
            let row = product.into_product(ids.mint(d.next_seq), created_at);
            d.products.push(row.clone());
            (row, true)
        })
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<Product>> {
        self.doc.read(|d| d.products.iter().find(|p| p.id == id).cloned())
    }

    fn update(&self, product: &Product) -> StoreResult<bool> {
        self.doc.modify(|d| match d.products.iter_mut().find(|p| p.id == product.id) {
            Some(slot) => { *slot = product.clone(); (true, true) }
            None => (false, false),
        })
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        self.doc.modify(|d| {
            let before = d.products.len();
            d.products.retain(|p| p.id != id);
            let removed = d.products.len() != before;
            (removed, removed)
        })
    }

    fn list_all(&self) -> StoreResult<Vec<Product>> {
        self.doc.read(|d| d.products.clone())
    }

    fn count(&self) -> StoreResult<usize> {
        self.doc.read(|d| d.products.len())
    }
}
