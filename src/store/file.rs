//! JSON file store
//!
//! One directory level per namespace segment under the data directory, with a
//! records file holding a JSON object of key -> value. Writes rewrite the
//! whole file through a temp file and rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use url::form_urlencoded;

use crate::core::{ForgeError, Result};
use crate::store::Store;

/// Store that persists each namespace as a JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

/// Records file inside a namespace directory. `@` is always
/// percent-encoded in segments, so no segment directory can share its name.
const RECORDS_FILE: &str = "@records.json";

/// Encode one namespace segment into a directory name
fn encode_segment(segment: &str) -> Result<String> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(ForgeError::store(format!("Invalid namespace segment '{}'", segment)));
    }
    Ok(form_urlencoded::byte_serialize(segment.as_bytes()).collect())
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            ForgeError::store(format!("Failed to create store dir {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of this store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_file(&self, namespace: &[String]) -> Result<PathBuf> {
        if namespace.is_empty() {
            return Err(ForgeError::store("Namespace must not be empty"));
        }
        let mut path = self.root.clone();
        for segment in namespace {
            path.push(encode_segment(segment)?);
        }
        path.push(RECORDS_FILE);
        Ok(path)
    }

    async fn read_namespace(path: &Path) -> Result<BTreeMap<String, Value>> {
        match fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ForgeError::store(format!("Corrupt store file {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get(&self, namespace: &[String], key: &str) -> Result<Option<Value>> {
        let path = self.namespace_file(namespace)?;
        let mut records = Self::read_namespace(&path).await?;
        Ok(records.remove(key))
    }

    async fn put(&self, namespace: &[String], key: &str, value: Value) -> Result<()> {
        let path = self.namespace_file(namespace)?;
        let _guard = self.write_lock.lock().await;

        let mut records = Self::read_namespace(&path).await?;
        records.insert(key.to_string(), value);

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&records)?).await?;
        fs::rename(&tmp, &path).await?;

        tracing::debug!(path = %path.display(), key, "store record written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ns(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("system_messages").unwrap(), "system_messages");
        assert_eq!(encode_segment("a/b").unwrap(), "a%2Fb");
        assert_eq!(encode_segment("user.1").unwrap(), "user.1");
        assert_eq!(encode_segment("@records.json").unwrap(), "%40records.json");
        assert!(encode_segment("..").is_err());
        assert!(encode_segment("").is_err());
    }

    #[tokio::test]
    async fn test_dotted_segments_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        store.put(&ns(&["a.b"]), "k", json!("joined")).await.unwrap();
        store.put(&ns(&["a", "b"]), "k", json!("nested")).await.unwrap();
        store.put(&ns(&["a"]), "k", json!("parent")).await.unwrap();

        assert_eq!(store.get(&ns(&["a.b"]), "k").await.unwrap(), Some(json!("joined")));
        assert_eq!(store.get(&ns(&["a", "b"]), "k").await.unwrap(), Some(json!("nested")));
        assert_eq!(store.get(&ns(&["a"]), "k").await.unwrap(), Some(json!("parent")));
    }

    #[tokio::test]
    async fn test_traversal_segment_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.put(&ns(&["..", "x"]), "k", json!(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_put_get_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let namespace = ns(&["system_messages", "user-1"]);

        let store = JsonFileStore::open(dir.path()).unwrap();
        store
            .put(&namespace, "assistant-1", json!({"mainInstruction": "be brief"}))
            .await
            .unwrap();

        let reopened = JsonFileStore::open(dir.path()).unwrap();
        let value = reopened.get(&namespace, "assistant-1").await.unwrap();
        assert_eq!(value, Some(json!({"mainInstruction": "be brief"})));
        assert!(reopened.get(&namespace, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_in_same_namespace_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let namespace = ns(&["system_messages", "u"]);

        store.put(&namespace, "a1", json!(1)).await.unwrap();
        store.put(&namespace, "a2", json!(2)).await.unwrap();

        assert_eq!(store.get(&namespace, "a1").await.unwrap(), Some(json!(1)));
        assert_eq!(store.get(&namespace, "a2").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_empty_namespace_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.get(&[], "k").await.is_err());
    }
}
