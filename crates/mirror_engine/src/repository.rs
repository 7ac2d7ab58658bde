use std::sync::Arc;

use mirror_core::{decode_content, decode_time_map, Content, TimeMap};
use mirror_logging::mirror_warn;
use serde::Serialize;
use serde_json::Value;

use crate::kv::{KeyValueStore, SetOptions, StoreError};

/// Key under which the page inventory is stored.
pub const TIME_MAP_KEY: &str = "index";

fn to_value<T: Serialize>(key: &str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })
}

/// Typed access to the stored inventory. Malformed stored data reads as absent.
#[derive(Clone)]
pub struct TimeMapRepository {
    store: Arc<dyn KeyValueStore>,
    options: SetOptions,
}

impl TimeMapRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            options: SetOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SetOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn get(&self) -> Result<Option<TimeMap>, StoreError> {
        let Some(value) = self.store.get(TIME_MAP_KEY).await? else {
            return Ok(None);
        };
        match decode_time_map(&value) {
            Ok(time_map) => Ok(Some(time_map)),
            Err(err) => {
                mirror_warn!("Discarding stored time map: {}", err);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, time_map: &TimeMap) -> Result<(), StoreError> {
        let value = to_value(TIME_MAP_KEY, time_map)?;
        self.store.set(TIME_MAP_KEY, &value, self.options).await
    }
}

/// Typed access to stored posts, keyed by original URL. Malformed stored data reads as absent.
#[derive(Clone)]
pub struct ContentRepository {
    store: Arc<dyn KeyValueStore>,
    options: SetOptions,
}

impl ContentRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            options: SetOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SetOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn get(&self, url: &str) -> Result<Option<Content>, StoreError> {
        let Some(value) = self.store.get(url).await? else {
            return Ok(None);
        };
        match decode_content(&value) {
            Ok(content) => Ok(Some(content)),
            Err(err) => {
                mirror_warn!("Discarding stored content for {}: {}", url, err);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, url: &str, content: &Content) -> Result<(), StoreError> {
        let value = to_value(url, content)?;
        self.store.set(url, &value, self.options).await
    }
}
