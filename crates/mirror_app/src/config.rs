//! Run configuration: built-in defaults, optionally replaced field by field from a
//! RON file, then by command-line flags and environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use mirror_core::SiteQuery;
use mirror_engine::kv::SetOptions;
use mirror_engine::{ArchiveSettings, ContentSelectors, RetryPolicy, DEFAULT_ARCHIVE_URL};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SITE_URL: &str = "agile.egloos.com/";
pub const DEFAULT_URL_PATTERN: &str = "^https://agile.egloos.com/[0-9]+$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Nothing survives the process.
    Memory,
    /// One JSON file per key under `{data_dir}/pages` and `{data_dir}/contents`.
    #[default]
    File,
    /// Embedded sled database at `{data_dir}/mirror.sled`.
    Sled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub title: String,
    pub body: String,
    pub created_at: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        let selectors = ContentSelectors::default();
        Self {
            title: selectors.title,
            body: selectors.body,
            created_at: selectors.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub data_dir: PathBuf,
    pub store: StoreBackend,
    pub archive_url: String,
    pub site_url: String,
    pub url_pattern: String,
    pub concurrency: usize,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Lifetime of stored pages and posts. Only the sled backend expires entries.
    pub cache_ttl_secs: Option<u64>,
    pub selectors: SelectorConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            data_dir: PathBuf::from("data"),
            store: StoreBackend::default(),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            url_pattern: DEFAULT_URL_PATTERN.to_string(),
            concurrency: mirror_engine::DEFAULT_CONCURRENCY,
            retry_attempts: retry.max_attempts,
            retry_delay_ms: retry.delay.as_millis() as u64,
            cache_ttl_secs: None,
            selectors: SelectorConfig::default(),
        }
    }
}

/// Values given on the command line or through the environment. `None` keeps
/// whatever the file or the defaults said.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub store: Option<StoreBackend>,
    pub archive_url: Option<String>,
    pub site_url: Option<String>,
    pub url_pattern: Option<String>,
    pub concurrency: Option<usize>,
}

impl MirrorConfig {
    /// Read a RON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_ron(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_ron(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_overrides(overrides))
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(data_dir) = overrides.data_dir {
            self.data_dir = data_dir;
        }
        if let Some(store) = overrides.store {
            self.store = store;
        }
        if let Some(archive_url) = overrides.archive_url {
            self.archive_url = archive_url;
        }
        if let Some(site_url) = overrides.site_url {
            self.site_url = site_url;
        }
        if let Some(url_pattern) = overrides.url_pattern {
            self.url_pattern = url_pattern;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        self
    }

    pub fn query(&self) -> SiteQuery {
        SiteQuery::new(&self.site_url, &self.url_pattern)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn store_options(&self) -> SetOptions {
        SetOptions {
            expire_in: self.cache_ttl_secs.map(Duration::from_secs),
        }
    }

    pub fn archive_settings(&self) -> ArchiveSettings {
        ArchiveSettings {
            base_url: self.archive_url.clone(),
            retry: self.retry_policy(),
            ..ArchiveSettings::default()
        }
    }

    pub fn content_selectors(&self) -> ContentSelectors {
        ContentSelectors {
            title: self.selectors.title.clone(),
            body: self.selectors.body.clone(),
            created_at: self.selectors.created_at.clone(),
        }
    }
}
