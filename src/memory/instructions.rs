//! Stored assistant instructions
//!
//! One record per `(user_id, assistant_id)`, kept under the namespace
//! `[category, user_id]` with `assistant_id` as the key. Every write is a
//! partial update: supplied fields overwrite, the rest are carried over.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{ForgeError, Result};
use crate::store::Store;

/// Main behavior of the assistant
pub const MAIN_INSTRUCTION: &str = "mainInstruction";
/// Instructions for contextual option buttons
pub const INLINE_OPTIONS_INSTRUCTION: &str = "inlineOptionsInstruction";
/// Instructions for persistent command buttons
pub const MAIN_OPTIONS_INSTRUCTION: &str = "mainOptionsInstruction";
/// Display name of the assistant
pub const ASSISTANT_NAME: &str = "assistantName";

/// Fields an instruction record knows about
pub const INSTRUCTION_FIELDS: [&str; 4] = [
    MAIN_INSTRUCTION,
    INLINE_OPTIONS_INSTRUCTION,
    MAIN_OPTIONS_INSTRUCTION,
    ASSISTANT_NAME,
];

/// Default namespace category
pub const DEFAULT_CATEGORY: &str = "system_messages";

/// A stored instruction record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredInstruction {
    /// Current field values
    pub fields: BTreeMap<String, String>,
    /// Values the last write replaced, for fields it touched
    #[serde(default)]
    pub previous: BTreeMap<String, String>,
}

impl StoredInstruction {
    /// Read a record, accepting the flat `{field: text}` layout as well
    fn from_value(value: Value) -> Result<Self> {
        if value.get("fields").is_some_and(Value::is_object) {
            return serde_json::from_value(value).map_err(|e| {
                ForgeError::store(format!("Malformed instruction record: {}", e))
            });
        }

        match value {
            Value::Object(map) => Ok(Self {
                fields: map
                    .into_iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                    .collect(),
                previous: BTreeMap::new(),
            }),
            _ => Err(ForgeError::store("Instruction record is not an object")),
        }
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Old and new value of one field after a write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl FieldChange {
    /// Whether the write changed this field
    pub fn changed(&self) -> bool {
        self.old != self.new
    }
}

/// Result of a partial update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistOutcome {
    pub assistant_id: String,
    /// The record as written
    pub record: StoredInstruction,
    /// Old/new pair for every field in the written record
    pub changes: Vec<FieldChange>,
}

impl PersistOutcome {
    /// Tool-result payload: the assistant id and the per-field changes
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "assistantId": self.assistant_id,
            "changes": self.changes,
        })
    }
}

/// Adapter over the key-value store for instruction records
#[derive(Clone)]
pub struct InstructionStore {
    store: Arc<dyn Store>,
    category: String,
}

impl InstructionStore {
    /// Wrap a store using the default namespace category
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_category(store, DEFAULT_CATEGORY)
    }

    /// Wrap a store using a custom namespace category
    pub fn with_category(store: Arc<dyn Store>, category: impl Into<String>) -> Self {
        Self {
            store,
            category: category.into(),
        }
    }

    fn namespace(&self, user_id: &str) -> Vec<String> {
        vec![self.category.clone(), user_id.to_string()]
    }

    /// Load the record for `(user_id, assistant_id)`
    pub async fn load(&self, user_id: &str, assistant_id: &str) -> Result<Option<StoredInstruction>> {
        self.store
            .get(&self.namespace(user_id), assistant_id)
            .await?
            .map(StoredInstruction::from_value)
            .transpose()
    }

    /// Merge `updates` over the stored record and write it back.
    ///
    /// The read and the write are separate store calls; a concurrent writer
    /// to the same key between them is overwritten.
    pub async fn merge_fields(
        &self,
        user_id: &str,
        assistant_id: &str,
        updates: &BTreeMap<String, String>,
    ) -> Result<PersistOutcome> {
        let prior = self.load(user_id, assistant_id).await?.unwrap_or_default();

        let mut fields = prior.fields.clone();
        let mut previous = BTreeMap::new();
        for (field, value) in updates {
            if let Some(old) = fields.insert(field.clone(), value.clone()) {
                previous.insert(field.clone(), old);
            }
        }

        let changes = fields
            .iter()
            .map(|(field, new)| FieldChange {
                field: field.clone(),
                old: prior.fields.get(field).cloned(),
                new: Some(new.clone()),
            })
            .collect();

        let record = StoredInstruction { fields, previous };
        self.store
            .put(
                &self.namespace(user_id),
                assistant_id,
                serde_json::to_value(&record)?,
            )
            .await?;

        tracing::info!(
            user_id,
            assistant_id,
            updated = updates.len(),
            "instruction record written"
        );

        Ok(PersistOutcome {
            assistant_id: assistant_id.to_string(),
            record,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn updates(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_first_write_reports_absent_old_values() {
        let store = InstructionStore::new(Arc::new(InMemoryStore::new()));
        let outcome = store
            .merge_fields("u1", "a1", &updates(&[(MAIN_INSTRUCTION, "be kind"), (ASSISTANT_NAME, "Kit")]))
            .await
            .unwrap();

        assert!(outcome.changes.iter().all(|c| c.old.is_none()));
        let stored = store.load("u1", "a1").await.unwrap().unwrap();
        assert_eq!(stored.fields.len(), 2);
        assert_eq!(stored.get(MAIN_INSTRUCTION), Some("be kind"));
        assert!(stored.previous.is_empty());
    }

    #[tokio::test]
    async fn test_merge_preserves_unspecified_fields() {
        let store = InstructionStore::new(Arc::new(InMemoryStore::new()));
        store.merge_fields("u1", "a1", &updates(&[("a", "1")])).await.unwrap();
        store.merge_fields("u1", "a1", &updates(&[("b", "2")])).await.unwrap();

        let stored = store.load("u1", "a1").await.unwrap().unwrap();
        assert_eq!(stored.get("a"), Some("1"));
        assert_eq!(stored.get("b"), Some("2"));
    }

    #[tokio::test]
    async fn test_repeated_write_reports_value_before_second_call() {
        let store = InstructionStore::new(Arc::new(InMemoryStore::new()));
        store.merge_fields("u1", "a1", &updates(&[("field", "W")])).await.unwrap();
        store.merge_fields("u1", "a1", &updates(&[("field", "X")])).await.unwrap();
        let outcome = store
            .merge_fields("u1", "a1", &updates(&[("field", "X")]))
            .await
            .unwrap();

        let change = outcome.changes.iter().find(|c| c.field == "field").unwrap();
        assert_eq!(change.old.as_deref(), Some("X"));
        assert_eq!(change.new.as_deref(), Some("X"));
        assert!(!change.changed());
        assert_eq!(outcome.record.get("field"), Some("X"));
    }

    #[tokio::test]
    async fn test_records_are_scoped_by_user_and_assistant() {
        let store = InstructionStore::new(Arc::new(InMemoryStore::new()));
        store.merge_fields("u1", "a1", &updates(&[("f", "one")])).await.unwrap();
        store.merge_fields("u2", "a1", &updates(&[("f", "two")])).await.unwrap();
        store.merge_fields("u1", "a2", &updates(&[("f", "three")])).await.unwrap();

        assert_eq!(store.load("u1", "a1").await.unwrap().unwrap().get("f"), Some("one"));
        assert_eq!(store.load("u2", "a1").await.unwrap().unwrap().get("f"), Some("two"));
        assert_eq!(store.load("u1", "a2").await.unwrap().unwrap().get("f"), Some("three"));
    }

    #[tokio::test]
    async fn test_reads_flat_legacy_records() {
        let raw = Arc::new(InMemoryStore::new());
        raw.put(
            &["system_messages".to_string(), "u1".to_string()],
            "a1",
            json!({"mainInstruction": "legacy", "count": 3}),
        )
        .await
        .unwrap();

        let store = InstructionStore::new(raw);
        let stored = store.load("u1", "a1").await.unwrap().unwrap();
        assert_eq!(stored.get(MAIN_INSTRUCTION), Some("legacy"));
        assert_eq!(stored.fields.len(), 1);
    }
}
