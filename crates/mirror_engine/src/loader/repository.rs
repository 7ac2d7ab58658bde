use mirror_core::{Content, SiteQuery, TimeMap, TimeMapEntry};

use super::{Loader, Writer};
use crate::repository::{ContentRepository, TimeMapRepository};
use crate::ResolveError;

/// Cached inventory. There is only one per store, so the query is not part of the key.
pub struct RepositoryTimeMapLoader {
    repository: TimeMapRepository,
}

impl RepositoryTimeMapLoader {
    pub fn new(repository: TimeMapRepository) -> Self {
        Self { repository }
    }
}

#[async_trait::async_trait]
impl Loader<SiteQuery, TimeMap> for RepositoryTimeMapLoader {
    async fn load(&self, _target: &SiteQuery) -> Result<Option<TimeMap>, ResolveError> {
        Ok(self.repository.get().await?)
    }
}

pub struct RepositoryTimeMapWriter {
    repository: TimeMapRepository,
}

impl RepositoryTimeMapWriter {
    pub fn new(repository: TimeMapRepository) -> Self {
        Self { repository }
    }
}

#[async_trait::async_trait]
impl Writer<SiteQuery, TimeMap> for RepositoryTimeMapWriter {
    async fn write(&self, _target: &SiteQuery, value: &TimeMap) -> Result<(), ResolveError> {
        Ok(self.repository.save(value).await?)
    }
}

/// Cached post for the entry's original URL, whatever snapshot it came from.
pub struct RepositoryContentLoader {
    repository: ContentRepository,
}

impl RepositoryContentLoader {
    pub fn new(repository: ContentRepository) -> Self {
        Self { repository }
    }
}

#[async_trait::async_trait]
impl Loader<TimeMapEntry, Content> for RepositoryContentLoader {
    async fn load(&self, target: &TimeMapEntry) -> Result<Option<Content>, ResolveError> {
        Ok(self.repository.get(&target.url).await?)
    }
}

pub struct RepositoryContentWriter {
    repository: ContentRepository,
}

impl RepositoryContentWriter {
    pub fn new(repository: ContentRepository) -> Self {
        Self { repository }
    }
}

#[async_trait::async_trait]
impl Writer<TimeMapEntry, Content> for RepositoryContentWriter {
    async fn write(&self, target: &TimeMapEntry, value: &Content) -> Result<(), ResolveError> {
        Ok(self.repository.save(&target.url, value).await?)
    }
}
