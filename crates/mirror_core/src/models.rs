use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// One known capture of a page: archive-assigned capture time plus the original URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeMapEntry {
    pub timestamp: String,
    pub url: String,
}

impl TimeMapEntry {
    pub fn new(timestamp: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            url: url.into(),
        }
    }

    /// Checks that `url` is an absolute, parseable URL.
    pub fn validate(&self) -> Result<(), ValidationError> {
        Url::parse(&self.url).map_err(|err| ValidationError::InvalidUrl {
            url: self.url.clone(),
            message: err.to_string(),
        })?;
        Ok(())
    }
}

impl fmt::Display for TimeMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.url, self.timestamp)
    }
}

/// Pages known to exist, in archive order. Duplicates are not filtered.
pub type TimeMap = Vec<TimeMapEntry>;

/// Which part of the archive a TimeMap is drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteQuery {
    /// Site prefix handed to the inventory endpoint, e.g. `agile.egloos.com/`.
    pub site_url: String,
    /// Pattern the original URLs must match, e.g. `^https://agile.egloos.com/[0-9]+$`.
    pub url_pattern: String,
}

impl SiteQuery {
    pub fn new(site_url: impl Into<String>, url_pattern: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            url_pattern: url_pattern.into(),
        }
    }
}

impl fmt::Display for SiteQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} matching {}", self.site_url, self.url_pattern)
    }
}

/// Normalized post extracted from an archived page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub title: String,
    /// HTML fragment.
    pub body: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {record} shape: {message}")]
    Shape {
        record: &'static str,
        message: String,
    },
    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Decode a stored value into a TimeMap, rejecting entries whose URL is not absolute.
pub fn decode_time_map(value: &Value) -> Result<TimeMap, ValidationError> {
    let time_map: TimeMap =
        serde_json::from_value(value.clone()).map_err(|err| ValidationError::Shape {
            record: "time map",
            message: err.to_string(),
        })?;
    for entry in &time_map {
        entry.validate()?;
    }
    Ok(time_map)
}

/// Decode a stored value into Content.
pub fn decode_content(value: &Value) -> Result<Content, ValidationError> {
    serde_json::from_value(value.clone()).map_err(|err| ValidationError::Shape {
        record: "content",
        message: err.to_string(),
    })
}
