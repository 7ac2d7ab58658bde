use std::sync::LazyLock;

use regex::Regex;

use crate::Content;

static ONCLICK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"onclick="[^"]*""#).expect("valid regex"));

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// Cleans resolved posts before they reach a sink:
/// - drops inline `onclick="..."` handlers
/// - drops HTML comments
///
/// Title and creation time pass through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentProcessor;

impl ContentProcessor {
    pub fn process(&self, content: Content) -> Content {
        let body = ONCLICK_RE.replace_all(&content.body, "");
        let body = COMMENT_RE.replace_all(&body, "").into_owned();
        Content { body, ..content }
    }
}

/// Order posts for the flat-file dump: oldest `created_at` first, undated posts
/// ahead of everything else. The sort is stable.
pub fn sort_for_dump(contents: &mut [Content]) {
    contents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}
