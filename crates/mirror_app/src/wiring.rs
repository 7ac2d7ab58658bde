use std::sync::Arc;

use anyhow::Context;
use mirror_engine::kv::{FileStore, KeyValueStore, MemoryStore, SledStore};
use mirror_engine::{
    content_provider, ensure_data_dir, time_map_provider, ContentParser, MirrorRunner,
    ReqwestArchiveClient,
};
use mirror_logging::mirror_info;

use crate::config::{MirrorConfig, StoreBackend};

pub const PAGES_NAMESPACE: &str = "pages";
pub const CONTENTS_NAMESPACE: &str = "contents";
pub const SLED_DIR: &str = "mirror.sled";

/// The inventory store and the post store for the configured backend.
pub struct Stores {
    pub pages: Arc<dyn KeyValueStore>,
    pub contents: Arc<dyn KeyValueStore>,
}

pub fn open_stores(config: &MirrorConfig) -> anyhow::Result<Stores> {
    let data_dir = &config.data_dir;
    let stores = match config.store {
        StoreBackend::Memory => Stores {
            pages: Arc::new(MemoryStore::new()),
            contents: Arc::new(MemoryStore::new()),
        },
        StoreBackend::File => {
            ensure_data_dir(data_dir)
                .with_context(|| format!("cannot use data dir {}", data_dir.display()))?;
            Stores {
                pages: Arc::new(FileStore::new(data_dir.join(PAGES_NAMESPACE))),
                contents: Arc::new(FileStore::new(data_dir.join(CONTENTS_NAMESPACE))),
            }
        }
        StoreBackend::Sled => {
            ensure_data_dir(data_dir)
                .with_context(|| format!("cannot use data dir {}", data_dir.display()))?;
            let path = data_dir.join(SLED_DIR);
            let db = SledStore::open(&path)
                .with_context(|| format!("failed to open database {}", path.display()))?;
            Stores {
                pages: Arc::new(db.tree(PAGES_NAMESPACE)?),
                contents: Arc::new(db.tree(CONTENTS_NAMESPACE)?),
            }
        }
    };
    mirror_info!("Using {:?} store in {}", config.store, data_dir.display());
    Ok(stores)
}

pub fn build_runner(config: &MirrorConfig) -> anyhow::Result<MirrorRunner> {
    let stores = open_stores(config)?;
    let client = Arc::new(
        ReqwestArchiveClient::new(config.archive_settings())
            .context("failed to build archive client")?,
    );
    let parser = Arc::new(ContentParser::new(config.content_selectors())?);
    let options = config.store_options();

    let runner = MirrorRunner::new(
        config.query(),
        Arc::new(time_map_provider(stores.pages, client.clone(), options)),
        Arc::new(content_provider(stores.contents, client, parser, options)),
    )
    .with_concurrency(config.concurrency)
    .with_archive_base_url(&config.archive_url);
    Ok(runner)
}
