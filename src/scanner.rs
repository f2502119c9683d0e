// src/scanner.rs
//! Incremental watermark scan over an account's feed.
//!
//! A scan walks one page of posts newest-first and compares each post's
//! timestamp against `last`, the watermark the scan started with. The first
//! non-pinned post that is not newer than `last` marks the end of new
//! content. Pinned posts sit at the top of the feed regardless of age, so a
//! stale pinned post is skipped instead of ending the scan.
//!
//! The returned watermark tracks the newest timestamp seen on the page, even
//! for posts that were skipped, so it never moves backwards.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::StreamExt;
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};

use crate::error::{ScanError, ScanFailure};
use crate::feed::{FeedSource, Post, DEFAULT_PAGE_SIZE};
use crate::notify::Notifier;
use crate::shutdown::Shutdown;

/// How far back the startup watermark reaches, so posts published just
/// before launch are still picked up by the first scan.
pub const STARTUP_LOOKBACK_SECS: i64 = 60;

/// Newest post timestamp accepted as seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    pub fn at(ts: DateTime<Utc>) -> Self {
        Self(ts)
    }

    /// Watermark for a process starting at `now`.
    pub fn startup_at(now: DateTime<Utc>) -> Self {
        Self(now - ChronoDuration::seconds(STARTUP_LOOKBACK_SECS))
    }

    pub fn startup() -> Self {
        Self::startup_at(Utc::now())
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// Move forward to `ts` if it is newer. Returns whether it moved.
    pub fn advance(&mut self, ts: DateTime<Utc>) -> bool {
        if ts > self.0 {
            self.0 = ts;
            true
        } else {
            false
        }
    }

    /// Strictly newer than the watermark.
    pub fn is_before(&self, ts: DateTime<Utc>) -> bool {
        ts > self.0
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// What to watch: an account and the keyword its posts must mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanQuery {
    pub account: String,
    keyword: String,
}

impl ScanQuery {
    /// The keyword is lowercased here; emptiness is checked by the caller.
    pub fn new(account: impl Into<String>, keyword: &str) -> Self {
        Self {
            account: account.into(),
            keyword: keyword.to_lowercase(),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Pinned, and not newer than the scan's starting watermark.
    PinnedStale,
    /// New, but the text does not mention the keyword.
    KeywordMismatch,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::PinnedStale => "pinned_stale",
            SkipReason::KeywordMismatch => "keyword_mismatch",
        }
    }
}

/// Per-post decision. The watermark advances for every verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Already seen: end the scan here.
    Stop,
    /// Keep scanning without notifying.
    Skip(SkipReason),
    /// New and matching: notify, then keep scanning.
    Notify,
}

/// Classify `post` against the scan's starting watermark `last`.
pub fn classify(post: &Post, last: Watermark, keyword: &str) -> Verdict {
    if !last.is_before(post.observed_at) {
        return if post.is_pinned {
            Verdict::Skip(SkipReason::PinnedStale)
        } else {
            Verdict::Stop
        };
    }
    if post.mentions(keyword) {
        Verdict::Notify
    } else {
        Verdict::Skip(SkipReason::KeywordMismatch)
    }
}

/// Outcome of a completed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub top: Watermark,
    /// Posts that triggered a notification, in delivery order.
    pub notified: Vec<Post>,
    pub examined: usize,
    pub skipped: usize,
    /// True when the scan ended on an already-seen post rather than
    /// running out of page.
    pub stopped_on_seen: bool,
}

impl ScanReport {
    fn new(top: Watermark) -> Self {
        Self {
            top,
            notified: Vec::new(),
            examined: 0,
            skipped: 0,
            stopped_on_seen: false,
        }
    }
}

pub struct WatermarkScanner {
    feed: Box<dyn FeedSource>,
    notifier: Box<dyn Notifier>,
    page_size: usize,
}

impl WatermarkScanner {
    pub fn new(feed: impl FeedSource + 'static, notifier: impl Notifier + 'static) -> Self {
        Self {
            feed: Box::new(feed),
            notifier: Box::new(notifier),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Posts requested per scan. Zero is raised to one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Run one scan starting from watermark `top`.
    ///
    /// On success the report carries the advanced watermark. On failure the
    /// error carries the watermark as far as it advanced before the failing
    /// post; nothing after that post is looked at.
    pub async fn scan(
        &self,
        ctx: &Shutdown,
        query: &ScanQuery,
        top: Watermark,
    ) -> Result<ScanReport, ScanFailure> {
        counter!("feed_scans_total").increment(1);
        let result = self.scan_page(ctx, query, top).await;

        match &result {
            Ok(report) => {
                gauge!("feed_watermark_unix_seconds").set(report.top.timestamp().timestamp() as f64);
                tracing::debug!(
                    account = %query.account,
                    top = %report.top,
                    examined = report.examined,
                    skipped = report.skipped,
                    notified = report.notified.len(),
                    stopped_on_seen = report.stopped_on_seen,
                    "scan finished"
                );
            }
            Err(failure) => {
                counter!("feed_scan_errors_total", "kind" => failure.error.kind()).increment(1);
            }
        }
        result
    }

    async fn scan_page(
        &self,
        ctx: &Shutdown,
        query: &ScanQuery,
        top: Watermark,
    ) -> Result<ScanReport, ScanFailure> {
        let last = top;
        let mut report = ScanReport::new(top);
        let fail = |top: Watermark, error: ScanError| ScanFailure { top, error };

        let mut posts = self.feed.fetch_recent(&query.account, self.page_size);
        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(fail(report.top, ScanError::Cancelled)),
                next = posts.next() => next,
            };
            let Some(item) = next else {
                break;
            };
            let post = item.map_err(|e| fail(report.top, e.into()))?;

            report.examined += 1;
            counter!("feed_posts_examined_total").increment(1);
            report.top.advance(post.observed_at);

            match classify(&post, last, query.keyword()) {
                Verdict::Stop => {
                    report.stopped_on_seen = true;
                    break;
                }
                Verdict::Skip(reason) => {
                    report.skipped += 1;
                    counter!("feed_posts_skipped_total", "reason" => reason.as_str()).increment(1);
                    tracing::debug!(
                        reason = reason.as_str(),
                        observed_at = %post.observed_at,
                        "post skipped"
                    );
                }
                Verdict::Notify => {
                    let sent = tokio::select! {
                        biased;
                        _ = ctx.cancelled() => return Err(fail(report.top, ScanError::Cancelled)),
                        sent = self.notifier.send() => sent,
                    };
                    sent.map_err(|e| fail(report.top, e.into()))?;

                    counter!("feed_notifications_total").increment(1);
                    tracing::info!(
                        account = %query.account,
                        webhook = self.notifier.target(),
                        "post: {}",
                        post.one_line()
                    );
                    report.notified.push(post);
                }
            }
        }

        Ok(report)
    }
}
