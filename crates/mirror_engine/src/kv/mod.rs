//! Persistent string-keyed map with interchangeable backends.
//!
//! Every backend treats a missing key and an explicit JSON `null` the same way:
//! `get` reports no entry.
use std::io;
use std::time::Duration;

use serde_json::Value;

mod embedded;
mod file;
mod memory;

pub use embedded::SledStore;
pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Time to live. Only honored by backends that support expiry.
    pub expire_in: Option<Duration>,
}

impl SetOptions {
    pub fn expiring_in(expire_in: Duration) -> Self {
        Self {
            expire_in: Some(expire_in),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize value for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
}

/// Safe for concurrent `get`/`set`; same-key races resolve as last writer wins.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: &Value, options: SetOptions) -> Result<(), StoreError>;
}
