use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;
use uuid::Uuid;

use super::{split_path, ChangeCallback, ChangeHub, Document, DocumentStore, StoreError, Subscription};

/// In-memory [`DocumentStore`] backed by an ordered path map.
///
/// Used by the test suites and by `--memory` mode, where nothing should
/// outlive the process. Path ordering makes `query` deterministic without
/// any extra bookkeeping.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<String, Value>>,
    changes: ChangeHub,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let path = format!("{collection}/{id}");
        self.documents
            .lock()
            .expect("store lock poisoned")
            .insert(path.clone(), data);
        self.changes.publish(&path);
        Ok(id)
    }

    fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        split_path(path)?;
        let documents = self.documents.lock().expect("store lock poisoned");
        Ok(documents.get(path).cloned())
    }

    fn set_full(&self, path: &str, data: Value) -> Result<(), StoreError> {
        split_path(path)?;
        self.documents
            .lock()
            .expect("store lock poisoned")
            .insert(path.to_string(), data);
        self.changes.publish(path);
        Ok(())
    }

    fn query(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let prefix = format!("{collection}/");
        let documents = self.documents.lock().expect("store lock poisoned");
        let mut results = Vec::new();
        for (path, data) in documents.range(prefix.clone()..) {
            let Some(id) = path.strip_prefix(&prefix) else {
                break;
            };
            // Grandchildren (nested collections) are not direct members.
            if id.contains('/') {
                continue;
            }
            results.push(Document {
                id: id.to_string(),
                data: data.clone(),
            });
        }
        Ok(results)
    }

    fn subscribe(&self, prefix: &str, callback: ChangeCallback) -> Subscription {
        self.changes.subscribe(prefix, callback)
    }
}
