// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod notify;
pub mod runner;
pub mod scanner;
pub mod shutdown;

// ---- Re-exports for stable public API ----
pub use crate::error::{FetchError, NotifyError, ScanError, ScanFailure};
pub use crate::feed::{FeedSource, Post, PostStream};
pub use crate::notify::{Notifier, WebhookConfig, WebhookNotifier};
pub use crate::scanner::{ScanQuery, ScanReport, Verdict, Watermark, WatermarkScanner};
pub use crate::shutdown::Shutdown;
