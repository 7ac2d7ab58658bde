use std::io;
use std::path::{Path, PathBuf};

use mirror_logging::{mirror_trace, mirror_warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{KeyValueStore, SetOptions, StoreError};
use crate::escape::encode_component;
use crate::persist::{AtomicFileWriter, PersistError};

/// One file per key: `{root}/{percent-encoded key}.json` holding `{"value": ...}`.
///
/// The root directory is created on first write. Expiry is not supported.
#[derive(Debug, Clone)]
pub struct FileStore {
    writer: AtomicFileWriter,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    value: &'a Value,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    value: Value,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        self.writer.dir()
    }

    pub fn file_name(key: &str) -> String {
        format!("{}.json", encode_component(key))
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root().join(Self::file_name(key))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key);
        mirror_trace!("Reading {} from {:?}", key, path);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        match serde_json::from_slice::<Envelope>(&bytes) {
            Ok(envelope) if envelope.value.is_null() => Ok(None),
            Ok(envelope) => Ok(Some(envelope.value)),
            Err(err) => {
                mirror_warn!("Ignoring unreadable entry {:?}: {}", path, err);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &Value, _options: SetOptions) -> Result<(), StoreError> {
        let body = serde_json::to_vec(&EnvelopeRef { value }).map_err(|source| {
            StoreError::Serialize {
                key: key.to_string(),
                source,
            }
        })?;
        let writer = self.writer.clone();
        let filename = Self::file_name(key);
        let written = tokio::task::spawn_blocking(move || writer.write(&filename, &body))
            .await
            .map_err(io::Error::other)
            .and_then(|result| {
                result.map_err(|err| match err {
                    PersistError::Io(source) => source,
                    other => io::Error::other(other.to_string()),
                })
            });
        written.map(|_| ()).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })
    }
}
