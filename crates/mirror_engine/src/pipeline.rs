use std::sync::Arc;

use mirror_core::{Content, SiteQuery, TimeMap, TimeMapEntry};

use crate::archive::ArchiveClient;
use crate::kv::{KeyValueStore, SetOptions};
use crate::loader::{
    ArchiveAlternatesLoader, ArchiveContentLoader, ArchiveTimeMapProvider, FallbackLoader,
    PersistingProvider, ProviderLoader, RepositoryContentLoader, RepositoryContentWriter,
    RepositoryTimeMapLoader, RepositoryTimeMapWriter,
};
use crate::parse::ContentParser;
use crate::repository::{ContentRepository, TimeMapRepository};

/// Cached inventory first, otherwise fetch it and persist before returning it.
/// `options` apply to every write, so an expiring entry forces a fresh listing later.
pub fn time_map_provider(
    store: Arc<dyn KeyValueStore>,
    client: Arc<dyn ArchiveClient>,
    options: SetOptions,
) -> FallbackLoader<SiteQuery, TimeMap> {
    let repository = TimeMapRepository::new(store).with_options(options);
    let live = PersistingProvider::new(
        ArchiveTimeMapProvider::new(client),
        RepositoryTimeMapWriter::new(repository.clone()),
    );
    FallbackLoader::new(vec![
        Box::new(RepositoryTimeMapLoader::new(repository)),
        Box::new(ProviderLoader::new(live)),
    ])
}

/// Cached post first, then the listed snapshot, then every other snapshot newest
/// first. Whatever the archive yields is persisted before it is returned.
pub fn content_provider(
    store: Arc<dyn KeyValueStore>,
    client: Arc<dyn ArchiveClient>,
    parser: Arc<ContentParser>,
    options: SetOptions,
) -> FallbackLoader<TimeMapEntry, Content> {
    let repository = ContentRepository::new(store).with_options(options);
    let archive: FallbackLoader<TimeMapEntry, Content> = FallbackLoader::new(vec![
        Box::new(ArchiveContentLoader::new(client.clone(), parser.clone())),
        Box::new(ArchiveAlternatesLoader::new(client, parser)),
    ]);
    let live = PersistingProvider::new(archive, RepositoryContentWriter::new(repository.clone()));
    FallbackLoader::new(vec![
        Box::new(RepositoryContentLoader::new(repository)),
        Box::new(ProviderLoader::new(live)),
    ])
}
