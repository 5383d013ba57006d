//! In-memory store, shared across runs within one process

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::core::Result;
use crate::store::Store;

type Namespace = Vec<String>;

/// Store backed by a `HashMap` behind an async `RwLock`
#[derive(Debug, Default)]
pub struct InMemoryStore {
    items: RwLock<HashMap<(Namespace, String), Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(&self, namespace: &[String], key: &str) -> Result<Option<Value>> {
        let items = self.items.read().await;
        Ok(items.get(&(namespace.to_vec(), key.to_string())).cloned())
    }

    async fn put(&self, namespace: &[String], key: &str, value: Value) -> Result<()> {
        self.items
            .write()
            .await
            .insert((namespace.to_vec(), key.to_string()), value);
        Ok(())
    }
}
