use std::time::Duration;

use futures_util::StreamExt;
use mirror_core::{TimeMap, TimeMapEntry};
use mirror_logging::{mirror_debug, mirror_warn};
use reqwest::header::CONTENT_TYPE;

use crate::decode::decode_html;
use crate::escape::encode_component;
use crate::retry::{with_retry, RetryError, RetryPolicy};
use crate::{ArchiveError, FailureKind};

pub const DEFAULT_ARCHIVE_URL: &str = "https://web.archive.org";

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    /// Scheme and host of the archive, without a trailing path.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARCHIVE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 16 * 1024 * 1024,
            user_agent: concat!("archive-mirror/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// The three archive endpoints the pipeline depends on.
#[async_trait::async_trait]
pub trait ArchiveClient: Send + Sync {
    /// Every successfully captured HTML page under `site_url` whose original URL matches `url_pattern`.
    async fn get_inventory(&self, site_url: &str, url_pattern: &str)
        -> Result<TimeMap, ArchiveError>;

    /// Raw HTML of one capture, decoded to UTF-8.
    async fn get_snapshot(&self, entry: &TimeMapEntry) -> Result<String, ArchiveError>;

    /// All known captures of `url`, in archive order.
    async fn list_alternate_snapshots(&self, url: &str) -> Result<TimeMap, ArchiveError>;
}

pub fn inventory_url(base_url: &str, site_url: &str, url_pattern: &str) -> String {
    format!(
        "{base}/web/timemap/json?url={site}&fl=endtimestamp,original&matchType=prefix\
         &filter=statuscode:200&filter=original:{pattern}&filter=mimetype:text/html\
         &collapse=urlkey&limit=150000",
        base = base_url.trim_end_matches('/'),
        site = encode_component(site_url),
        pattern = encode_component(url_pattern),
    )
}

pub fn snapshot_url(base_url: &str, entry: &TimeMapEntry) -> String {
    format!(
        "{}/web/{}/{}",
        base_url.trim_end_matches('/'),
        entry.timestamp,
        entry.url
    )
}

pub fn alternates_url(base_url: &str, url: &str) -> String {
    format!(
        "{}/cdx/search/cdx?url={}&output=json&fl=original,timestamp\
         &filter=mimetype:text/html&filter=statuscode:200",
        base_url.trim_end_matches('/'),
        url
    )
}

/// Column order of a tabular archive response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowLayout {
    /// `[timestamp, original]`, as served by the timemap endpoint.
    TimestampFirst,
    /// `[original, timestamp]`, as served by the CDX endpoint.
    OriginalFirst,
}

struct Fetched {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestArchiveClient {
    settings: ArchiveSettings,
    client: reqwest::Client,
}

impl ReqwestArchiveClient {
    pub fn new(settings: ArchiveSettings) -> Result<Self, ArchiveError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| {
                ArchiveError::new(FailureKind::Network, &settings.base_url, err.to_string())
            })?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ArchiveSettings {
        &self.settings
    }

    async fn fetch(&self, url: &str, timestamp: Option<&str>) -> Result<Fetched, ArchiveError> {
        with_retry(&self.settings.retry, ArchiveError::is_gateway_timeout, || {
            self.fetch_once(url)
        })
        .await
        .map_err(|err| match err {
            RetryError::Fatal(err) => err,
            RetryError::Exhausted { attempts, last } => ArchiveError::new(
                FailureKind::RetriesExhausted {
                    attempts,
                    last: Box::new(last.kind),
                },
                url,
                last.message,
            ),
        })
        .map_err(|err| err.at(timestamp))
    }

    async fn fetch_once(&self, url: &str) -> Result<Fetched, ArchiveError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| ArchiveError::new(FailureKind::InvalidUrl, url, err.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|err| map_reqwest_error(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArchiveError::new(
                FailureKind::HttpStatus(status.as_u16()),
                url,
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ArchiveError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    url,
                    "response too large",
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(url, err))?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ArchiveError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    url,
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}

#[async_trait::async_trait]
impl ArchiveClient for ReqwestArchiveClient {
    async fn get_inventory(
        &self,
        site_url: &str,
        url_pattern: &str,
    ) -> Result<TimeMap, ArchiveError> {
        mirror_debug!("Requesting inventory for {} matching {}", site_url, url_pattern);
        let url = inventory_url(&self.settings.base_url, site_url, url_pattern);
        let fetched = self.fetch(&url, None).await?;
        decode_rows(&fetched.bytes, RowLayout::TimestampFirst)
            .map_err(|message| ArchiveError::new(FailureKind::MalformedResponse, &url, message))
    }

    async fn get_snapshot(&self, entry: &TimeMapEntry) -> Result<String, ArchiveError> {
        mirror_debug!("Requesting snapshot {} at {}", entry.url, entry.timestamp);
        let url = snapshot_url(&self.settings.base_url, entry);
        let fetched = self.fetch(&url, Some(&entry.timestamp)).await?;
        let decoded = decode_html(&fetched.bytes, fetched.content_type.as_deref()).map_err(|err| {
            ArchiveError::new(FailureKind::Decode, &entry.url, err.to_string())
                .at(Some(&entry.timestamp))
        })?;
        if decoded.had_errors {
            mirror_warn!(
                "Snapshot {} at {} had malformed {} sequences",
                entry.url,
                entry.timestamp,
                decoded.encoding_label
            );
        }
        Ok(decoded.html)
    }

    async fn list_alternate_snapshots(&self, url: &str) -> Result<TimeMap, ArchiveError> {
        mirror_debug!("Listing alternate snapshots of {}", url);
        let request_url = alternates_url(&self.settings.base_url, url);
        let fetched = self.fetch(&request_url, None).await?;
        decode_rows(&fetched.bytes, RowLayout::OriginalFirst).map_err(|message| {
            ArchiveError::new(FailureKind::MalformedResponse, &request_url, message)
        })
    }
}

/// Parse a tabular JSON response, discarding the header row.
fn decode_rows(body: &[u8], layout: RowLayout) -> Result<TimeMap, String> {
    // The CDX endpoint answers an empty body when it knows no captures.
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let rows: Vec<Vec<String>> = serde_json::from_slice(body).map_err(|err| err.to_string())?;
    rows.into_iter()
        .skip(1)
        .map(|row| {
            let [first, second]: [String; 2] = row
                .try_into()
                .map_err(|row: Vec<String>| format!("expected 2 columns, got {}", row.len()))?;
            let entry = match layout {
                RowLayout::TimestampFirst => TimeMapEntry::new(first, second),
                RowLayout::OriginalFirst => TimeMapEntry::new(second, first),
            };
            entry.validate().map_err(|err| err.to_string())?;
            Ok(entry)
        })
        .collect()
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> ArchiveError {
    if err.is_timeout() {
        return ArchiveError::new(FailureKind::Timeout, url, err.to_string());
    }
    if err.is_redirect() {
        return ArchiveError::new(FailureKind::RedirectLimitExceeded, url, err.to_string());
    }
    ArchiveError::new(FailureKind::Network, url, err.to_string())
}
