//! Error types shared by the feed, notifier and scanner layers.

use reqwest::StatusCode;
use thiserror::Error;

use crate::scanner::Watermark;

/// The feed source failed to produce a page or a post.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Download failed before a status was received.
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed endpoint answered with a non-success status.
    #[error("feed returned status {0}")]
    Status(StatusCode),

    /// The document could not be parsed as a feed.
    #[error("feed document is malformed: {0}")]
    Parse(String),

    /// A single entry could not be turned into a post.
    #[error("feed entry {position} is invalid: {reason}")]
    InvalidPost { position: usize, reason: String },

    /// Failure reported by a non-HTTP source.
    #[error("{0}")]
    Source(String),
}

/// The outbound notification could not be delivered.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The HTTP client could not be constructed.
    #[error("couldn't build webhook client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport-level failure (connect, timeout, TLS...).
    #[error("webhook request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The target answered, but not with a 2xx.
    #[error("webhook returned invalid status code: {0}")]
    Status(StatusCode),

    /// Failure reported by a non-HTTP notifier.
    #[error("{0}")]
    Other(String),
}

/// Why a scan stopped before finishing its page.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// Shutdown was requested while the scan was in flight.
    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::Fetch(_) => "fetch",
            ScanError::Notify(_) => "notify",
            ScanError::Cancelled => "cancelled",
        }
    }
}

/// A scan that aborted, carrying the watermark as far as it had advanced.
#[derive(Debug, Error)]
#[error("scan aborted at watermark {top}: {error}")]
pub struct ScanFailure {
    pub top: Watermark,
    #[source]
    pub error: ScanError,
}
