// src/feed/mod.rs
pub mod rss;
pub mod scripted;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

pub use rss::RssFeedSource;
pub use scripted::ScriptedFeed;

/// Default number of posts pulled per scan.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// One entry of an account's feed.
///
/// Posts carry no stable id; the scanner identifies them by timestamp only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub text: String,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub is_pinned: bool,
}

impl Post {
    pub fn new(text: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            observed_at,
            is_pinned: false,
        }
    }

    pub fn pinned(mut self) -> Self {
        self.is_pinned = true;
        self
    }

    /// Case-insensitive substring match; `keyword` must already be lowercase.
    pub fn mentions(&self, keyword: &str) -> bool {
        self.text.to_lowercase().contains(keyword)
    }

    /// Text on a single line, for log output.
    pub fn one_line(&self) -> String {
        self.text.replace('\n', " ")
    }
}

/// Lazily produced, newest-first page of posts.
pub type PostStream<'a> = BoxStream<'a, Result<Post, FetchError>>;

/// Something that can list the most recent posts of an account.
///
/// Each call starts a fresh stream. Ordering is decided by the source and is
/// expected to be newest-first, except that pinned posts may appear anywhere.
/// After yielding an error the stream should end.
pub trait FeedSource: Send + Sync {
    fn fetch_recent<'a>(&'a self, account: &'a str, limit: usize) -> PostStream<'a>;

    fn name(&self) -> &'static str;
}

impl<F: FeedSource + ?Sized> FeedSource for std::sync::Arc<F> {
    fn fetch_recent<'a>(&'a self, account: &'a str, limit: usize) -> PostStream<'a> {
        (**self).fetch_recent(account, limit)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Normalize plain feed text: decode entities, collapse whitespace.
///
/// `<` and `>` are kept as literal characters.
pub fn normalize_plain_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    collapse_whitespace(&decoded)
}

/// Normalize an HTML fragment: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, " ");
    collapse_whitespace(&stripped)
}

fn collapse_whitespace(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(s, " ").trim().to_string()
}
