//! Mirror core: domain records, validation and pure content normalization.
mod models;
mod process;
mod record;

pub use models::{
    decode_content, decode_time_map, Content, SiteQuery, TimeMap, TimeMapEntry, ValidationError,
};
pub use process::{sort_for_dump, ContentProcessor};
pub use record::{page_id, plain_text, PageRecord};
