use std::path::{Path, PathBuf};

use mirror_core::PageRecord;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Destination for finished page records, e.g. the search database loader.
#[async_trait::async_trait]
pub trait ContentSink: Send + Sync {
    async fn store(&self, records: &[PageRecord]) -> Result<(), SinkError>;
}

/// Writes one JSON object per line, replacing the target file atomically.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl ContentSink for JsonLinesSink {
    async fn store(&self, records: &[PageRecord]) -> Result<(), SinkError> {
        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }
        let (writer, filename) = AtomicFileWriter::for_path(&self.path)?;
        writer.write(&filename, &buffer)?;
        Ok(())
    }
}
