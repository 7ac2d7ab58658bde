use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mirror_logging::mirror_warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{KeyValueStore, SetOptions, StoreError};

/// Durable store on the sled embedded database, with optional per-entry expiry.
///
/// Values are kept in an envelope that carries the expiry instant; expired
/// entries read as absent and are removed on access.
#[derive(Debug, Clone)]
pub struct SledStore {
    tree: sled::Tree,
    db: sled::Db,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at_ms: Option<u64>,
}

impl SledStore {
    /// Open or create the database at `path`, using its default tree.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        Ok(Self::from_db(db))
    }

    /// A throwaway database removed when the last handle is dropped.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::from_db(db))
    }

    /// Another namespace in the same database.
    pub fn tree(&self, name: &str) -> Result<Self, StoreError> {
        Ok(Self {
            tree: self.db.open_tree(name)?,
            db: self.db.clone(),
        })
    }

    fn from_db(db: sled::Db) -> Self {
        Self {
            tree: (*db).clone(),
            db,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

#[async_trait::async_trait]
impl KeyValueStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let Some(raw) = self.tree.get(key.as_bytes())? else {
            return Ok(None);
        };
        let envelope: Envelope = match serde_json::from_slice(&raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                mirror_warn!("Ignoring unreadable entry {}: {}", key, err);
                return Ok(None);
            }
        };
        if envelope.expires_at_ms.is_some_and(|at| at <= now_ms()) {
            // Only drop the entry if nobody replaced it in the meantime.
            let _ = self
                .tree
                .compare_and_swap(key.as_bytes(), Some(raw), None as Option<&[u8]>)?;
            return Ok(None);
        }
        Ok(Some(envelope.value).filter(|value| !value.is_null()))
    }

    async fn set(&self, key: &str, value: &Value, options: SetOptions) -> Result<(), StoreError> {
        let envelope = Envelope {
            value: value.clone(),
            expires_at_ms: options
                .expire_in
                .map(|ttl| now_ms().saturating_add(ttl.as_millis() as u64)),
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        let tree = self.tree.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || tree.insert(key.as_bytes(), bytes))
            .await
            .map_err(|err| sled::Error::Io(io::Error::other(err)))??;
        self.tree.flush_async().await?;
        Ok(())
    }
}
