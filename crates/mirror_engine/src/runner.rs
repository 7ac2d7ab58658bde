use std::path::Path;
use std::sync::Arc;

use futures_util::{stream, StreamExt, TryStreamExt};
use mirror_core::{sort_for_dump, Content, ContentProcessor, PageRecord, SiteQuery, TimeMap, TimeMapEntry};
use mirror_logging::{mirror_info, mirror_warn};

use crate::archive::{snapshot_url, DEFAULT_ARCHIVE_URL};
use crate::loader::Provider;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::sink::{ContentSink, SinkError};
use crate::ResolveError;

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries in the inventory.
    pub pages: usize,
    pub resolved: usize,
    pub failed: usize,
}

/// Batch driver: loads the inventory once, then resolves every entry.
///
/// `download` walks entries one by one and keeps going past failures. The dump
/// operations fan out up to `concurrency` resolutions at a time and are
/// all-or-nothing.
pub struct MirrorRunner {
    query: SiteQuery,
    time_maps: Arc<dyn Provider<SiteQuery, TimeMap>>,
    contents: Arc<dyn Provider<TimeMapEntry, Content>>,
    processor: ContentProcessor,
    archive_base_url: String,
    concurrency: usize,
}

impl MirrorRunner {
    pub fn new(
        query: SiteQuery,
        time_maps: Arc<dyn Provider<SiteQuery, TimeMap>>,
        contents: Arc<dyn Provider<TimeMapEntry, Content>>,
    ) -> Self {
        Self {
            query,
            time_maps,
            contents,
            processor: ContentProcessor,
            archive_base_url: DEFAULT_ARCHIVE_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Base used for the snapshot links stored in page records.
    pub fn with_archive_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.archive_base_url = base_url.into();
        self
    }

    pub async fn time_map(&self) -> Result<TimeMap, RunError> {
        let time_map = self.time_maps.load(&self.query).await?;
        mirror_info!("Loaded {} pages.", time_map.len());
        Ok(time_map)
    }

    pub async fn download(&self) -> Result<RunSummary, RunError> {
        let time_map = self.time_map().await?;
        let mut summary = RunSummary {
            pages: time_map.len(),
            ..RunSummary::default()
        };

        for entry in &time_map {
            match self.contents.load(entry).await {
                Ok(content) => {
                    let content = self.processor.process(content);
                    mirror_info!(
                        "Loaded page {} {} with title {}",
                        entry.timestamp,
                        entry.url,
                        content.title
                    );
                    summary.resolved += 1;
                }
                Err(err) => {
                    mirror_warn!("Failed to load {}: {}", entry, err);
                    summary.failed += 1;
                }
            }
        }

        mirror_info!(
            "Finished loading pages: {} resolved, {} failed.",
            summary.resolved,
            summary.failed
        );
        Ok(summary)
    }

    /// Resolve and clean every entry, keeping inventory order.
    pub async fn resolve_all(&self) -> Result<Vec<(TimeMapEntry, Content)>, RunError> {
        let time_map = self.time_map().await?;
        let contents = self.contents.as_ref();
        let processor = self.processor;

        let resolved = stream::iter(time_map)
            .map(|entry| async move {
                let content = contents.load(&entry).await?;
                Ok::<_, ResolveError>((entry, processor.process(content)))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        Ok(resolved)
    }

    /// Write every post as one JSON array, oldest first.
    pub async fn dump_file(&self, path: &Path) -> Result<RunSummary, RunError> {
        let resolved = self.resolve_all().await?;
        let pages = resolved.len();
        let mut contents: Vec<Content> = resolved.into_iter().map(|(_, content)| content).collect();
        sort_for_dump(&mut contents);

        let json = serde_json::to_vec(&contents)?;
        let (writer, filename) = AtomicFileWriter::for_path(path)?;
        let written = writer.write(&filename, &json)?;
        mirror_info!("Wrote {} posts to {:?}", pages, written);

        Ok(RunSummary {
            pages,
            resolved: pages,
            failed: 0,
        })
    }

    /// Hand every post to `sink` as a page record, in inventory order.
    pub async fn dump_records(&self, sink: &dyn ContentSink) -> Result<RunSummary, RunError> {
        let resolved = self.resolve_all().await?;
        let records: Vec<PageRecord> = resolved
            .into_iter()
            .map(|(entry, content)| {
                let archive_url = snapshot_url(&self.archive_base_url, &entry);
                PageRecord::new(&entry, archive_url, content)
            })
            .collect();
        sink.store(&records).await?;
        mirror_info!("Stored {} page records", records.len());

        Ok(RunSummary {
            pages: records.len(),
            resolved: records.len(),
            failed: 0,
        })
    }
}
