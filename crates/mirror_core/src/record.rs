use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Content, TimeMapEntry};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));

static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static TRAILING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)$").expect("valid regex"));

/// Row handed to the database sink. `plain_text` is what gets embedded for similarity search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: Option<u64>,
    pub url: String,
    pub archive_url: String,
    pub title: String,
    pub body: String,
    pub created_at: Option<String>,
    pub plain_text: String,
}

impl PageRecord {
    pub fn new(entry: &TimeMapEntry, archive_url: impl Into<String>, content: Content) -> Self {
        let plain_text = plain_text(&content.body);
        Self {
            id: page_id(&entry.url),
            url: entry.url.clone(),
            archive_url: archive_url.into(),
            title: content.title,
            body: content.body,
            created_at: content.created_at,
            plain_text,
        }
    }
}

/// Numeric post id taken from the trailing digits of a post URL.
pub fn page_id(url: &str) -> Option<u64> {
    TRAILING_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Reduce an HTML body to searchable text.
pub fn plain_text(body: &str) -> String {
    let text = body.replace('\u{FFFD}', "");
    let text = TAG_RE.replace_all(&text, " ");
    let text = URL_RE.replace_all(&text, "");
    let text = text.replace("&nbsp;", " ");
    SPACE_RE.replace_all(&text, " ").trim().to_string()
}
