use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::Mutex;

use super::{KeyValueStore, SetOptions, StoreError};

/// Process-lifetime store, mostly for tests. Ignores expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).filter(|value| !value.is_null()).cloned())
    }

    async fn set(&self, key: &str, value: &Value, _options: SetOptions) -> Result<(), StoreError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}
