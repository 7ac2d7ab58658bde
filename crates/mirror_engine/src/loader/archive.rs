use std::cmp::Ordering;
use std::sync::Arc;

use mirror_core::{Content, SiteQuery, TimeMap, TimeMapEntry};
use mirror_logging::{mirror_debug, mirror_info};

use super::{Loader, Provider};
use crate::archive::ArchiveClient;
use crate::parse::ContentParser;
use crate::ResolveError;

/// Live inventory from the archive's timemap endpoint.
pub struct ArchiveTimeMapProvider {
    client: Arc<dyn ArchiveClient>,
}

impl ArchiveTimeMapProvider {
    pub fn new(client: Arc<dyn ArchiveClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Provider<SiteQuery, TimeMap> for ArchiveTimeMapProvider {
    async fn load(&self, target: &SiteQuery) -> Result<TimeMap, ResolveError> {
        let time_map = self
            .client
            .get_inventory(&target.site_url, &target.url_pattern)
            .await?;
        mirror_info!("Archive lists {} pages for {}", time_map.len(), target);
        Ok(time_map)
    }
}

/// Parses the exact snapshot named by the entry. Reports absence when the page
/// lacks the post markers.
pub struct ArchiveContentLoader {
    client: Arc<dyn ArchiveClient>,
    parser: Arc<ContentParser>,
}

impl ArchiveContentLoader {
    pub fn new(client: Arc<dyn ArchiveClient>, parser: Arc<ContentParser>) -> Self {
        Self { client, parser }
    }
}

#[async_trait::async_trait]
impl Loader<TimeMapEntry, Content> for ArchiveContentLoader {
    async fn load(&self, target: &TimeMapEntry) -> Result<Option<Content>, ResolveError> {
        let html = self.client.get_snapshot(target).await?;
        let content = self.parser.parse(&html);
        if content.is_none() {
            mirror_info!("Post markers missing in {}, will try other snapshots", target);
        }
        Ok(content)
    }
}

/// Searches the other captures of the entry's URL, newest first, for one that parses.
pub struct ArchiveAlternatesLoader {
    client: Arc<dyn ArchiveClient>,
    parser: Arc<ContentParser>,
}

impl ArchiveAlternatesLoader {
    pub fn new(client: Arc<dyn ArchiveClient>, parser: Arc<ContentParser>) -> Self {
        Self { client, parser }
    }
}

#[async_trait::async_trait]
impl Loader<TimeMapEntry, Content> for ArchiveAlternatesLoader {
    async fn load(&self, target: &TimeMapEntry) -> Result<Option<Content>, ResolveError> {
        let snapshots = self.client.list_alternate_snapshots(&target.url).await?;
        let candidates = order_alternates(target, snapshots);
        mirror_debug!("{} alternate snapshots for {}", candidates.len(), target);

        for candidate in &candidates {
            let html = self.client.get_snapshot(candidate).await?;
            if let Some(content) = self.parser.parse(&html) {
                mirror_info!("Recovered {} from {}", target.url, candidate);
                return Ok(Some(content));
            }
            mirror_debug!("Post markers missing in {}", candidate);
        }
        Ok(None)
    }
}

/// Drop the capture that was already tried and order the rest newest first.
pub fn order_alternates(tried: &TimeMapEntry, snapshots: TimeMap) -> TimeMap {
    let mut candidates: TimeMap = snapshots
        .into_iter()
        .filter(|snapshot| snapshot.timestamp != tried.timestamp)
        .collect();
    candidates.sort_by(|a, b| compare_timestamps(&b.timestamp, &a.timestamp));
    candidates
}

/// Digit-only timestamps order numerically and rank above anything else, which
/// orders as plain text.
fn compare_timestamps(a: &str, b: &str) -> Ordering {
    match (digits(a), digits(b)) {
        (Some(a), Some(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// The significant digits of an all-digit string.
fn digits(timestamp: &str) -> Option<&str> {
    if timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(timestamp.trim_start_matches('0'))
}
