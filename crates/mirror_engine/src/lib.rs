//! Mirror engine: archive IO, storage backends and the loader pipeline.
mod archive;
mod decode;
mod escape;
pub mod kv;
pub mod loader;
mod parse;
mod persist;
mod pipeline;
mod repository;
mod retry;
mod runner;
mod sink;
mod types;

pub use archive::{
    alternates_url, inventory_url, snapshot_url, ArchiveClient, ArchiveSettings,
    ReqwestArchiveClient, DEFAULT_ARCHIVE_URL,
};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use escape::encode_component;
pub use parse::{ContentParser, ContentSelectors, SelectorError};
pub use persist::{ensure_data_dir, AtomicFileWriter, PersistError};
pub use pipeline::{content_provider, time_map_provider};
pub use repository::{ContentRepository, TimeMapRepository, TIME_MAP_KEY};
pub use retry::{with_retry, RetryError, RetryPolicy};
pub use runner::{MirrorRunner, RunError, RunSummary, DEFAULT_CONCURRENCY};
pub use sink::{ContentSink, JsonLinesSink, SinkError};
pub use types::{ArchiveError, FailureKind, ResolveError};
