use std::fmt;

use crate::kv::StoreError;

/// Failure of one archive call, with enough context to diagnose it without re-running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} for {url}{}: {message}", timestamp_suffix(.timestamp))]
pub struct ArchiveError {
    pub kind: FailureKind,
    pub url: String,
    pub timestamp: Option<String>,
    pub message: String,
}

impl ArchiveError {
    pub(crate) fn new(kind: FailureKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            timestamp: None,
            message: message.into(),
        }
    }

    pub(crate) fn at(mut self, timestamp: Option<&str>) -> Self {
        self.timestamp = timestamp.map(ToOwned::to_owned);
        self
    }

    /// A 504 from the archive gateway; the only failure worth retrying.
    pub fn is_gateway_timeout(&self) -> bool {
        self.kind == FailureKind::HttpStatus(504)
    }
}

fn timestamp_suffix(timestamp: &Option<String>) -> String {
    timestamp
        .as_deref()
        .map(|ts| format!(" at {ts}"))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    RetriesExhausted { attempts: u32, last: Box<FailureKind> },
    Decode,
    MalformedResponse,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::RetriesExhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts ({last})")
            }
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Failure surfaced by a loader or provider.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Every configured source reported absence.
    #[error("could not resolve {target}")]
    Exhausted { target: String },
}
