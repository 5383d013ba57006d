//! Store module - hierarchical key-value capability
//!
//! Records live under a namespace (a path of strings such as
//! `["system_messages", user_id]`) and a key. Writes are last-write-wins per
//! `put`; there is no compare-and-swap, so concurrent writers to the same
//! key may overwrite each other.

pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::config::{Config, StoreBackend};
use crate::core::Result;

pub use file::JsonFileStore;
pub use memory::InMemoryStore;

/// Key-value store capability
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch the value under `namespace`/`key`
    async fn get(&self, namespace: &[String], key: &str) -> Result<Option<Value>>;

    /// Replace the value under `namespace`/`key`
    async fn put(&self, namespace: &[String], key: &str, value: Value) -> Result<()>;
}

/// Build the store selected by configuration
pub fn from_config(config: &Config) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.store.backend {
        StoreBackend::Memory => Arc::new(InMemoryStore::new()),
        StoreBackend::File => Arc::new(JsonFileStore::open(config.data_dir())?),
    };
    Ok(store)
}
