//! Record stores backing the two product shards and the user directory.
//!
//! A store is anything implementing [`StorageBackend`] (products) or
//! [`UserStore`] (credentials). Two flavours ship with the crate:
//! - in-memory (`MemoryBackend`, `MemoryUserStore`), a `parking_lot` guarded map;
//! - file-backed (`FileBackend`, `FileUserStore`), a JSON document that is re-read
//!   and rewritten on every call so separate processes can share it.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, AppResult};

pub mod file;
pub mod memory;
pub mod users;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use users::{FileUserStore, InsertOutcome, MemoryUserStore, StoredUser, UserStore, UserSummary};

pub const DEFAULT_CATEGORY: &str = "General";

fn default_category() -> String { DEFAULT_CATEGORY.to_string() }

/// A product as persisted in exactly one shard. `id` is only unique within that shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub stock: u64,
    #[serde(default = "default_category")]
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a create; the shard assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: u64,
    pub category: String,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: f64, stock: u64) -> Self {
        Self { name: name.into(), description: String::new(), price, stock, category: default_category() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub(crate) fn into_product(self, id: String, at: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
            category: self.category,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Partial update: only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<u64>,
    pub category: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category.is_none()
    }

    /// Apply the present fields and stamp `updated_at`.
    pub fn apply(&self, product: &mut Product, at: DateTime<Utc>) {
        if let Some(name) = &self.name { product.name = name.clone(); }
        if let Some(description) = &self.description { product.description = description.clone(); }
        if let Some(price) = self.price { product.price = price; }
        if let Some(stock) = self.stock { product.stock = stock; }
        if let Some(category) = &self.category { product.category = category.clone(); }
        product.updated_at = at;
    }
}

/// How a store mints identifiers for new records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdScheme {
    /// Random 128-bit id rendered as 32 hex chars.
    #[default]
    Uuid,
    /// Per-store counter starting at 1. Two stores using this scheme hand out
    /// colliding ids; probing order decides which one a lookup sees.
    Sequential,
}

impl IdScheme {
    pub(crate) fn mint(&self, seq: u64) -> String {
        match self {
            IdScheme::Uuid => uuid::Uuid::new_v4().simple().to_string(),
            IdScheme::Sequential => seq.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{store}: i/o error on {}: {source}", .path.display())]
    Io {
        store: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{store}: unreadable document {}: {source}", .path.display())]
    Corrupt {
        store: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{store}: unavailable: {reason}")]
    Unavailable { store: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::upstream("store_unavailable".to_string(), err.to_string())
    }
}

/// Run store work on tokio's blocking pool. File-backed stores read and
/// rewrite a whole document per call, and Argon2 shares the same path.
pub async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal("task_failed".to_string(), e.to_string()))?
}

/// One physically independent product store.
pub trait StorageBackend: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Persist a new record and return it with the id this store assigned.
    fn insert(&self, product: NewProduct, created_at: DateTime<Utc>) -> StoreResult<Product>;

    fn find_by_id(&self, id: &str) -> StoreResult<Option<Product>>;

    /// Replace the stored record with the same id. Returns false if it no longer exists.
    fn update(&self, product: &Product) -> StoreResult<bool>;

    fn delete(&self, id: &str) -> StoreResult<bool>;

    fn list_all(&self) -> StoreResult<Vec<Product>>;

    fn count(&self) -> StoreResult<usize> {
        Ok(self.list_all()?.len())
    }
}
