// src/feed/scripted.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::stream;

use super::{FeedSource, Post, PostStream};
use crate::error::FetchError;

/// One scripted page entry.
#[derive(Debug, Clone)]
pub enum Entry {
    Post(Post),
    Fail(String),
}

impl From<Post> for Entry {
    fn from(p: Post) -> Self {
        Entry::Post(p)
    }
}

/// In-memory feed that serves the same page on every call until replaced.
/// Useful for tests and for dry runs without network access.
#[derive(Debug, Default)]
pub struct ScriptedFeed {
    page: Mutex<Vec<Entry>>,
    calls: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        Self {
            page: Mutex::new(entries.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the page served by subsequent calls.
    pub fn set_page<I, E>(&self, entries: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        let mut page = self.page.lock().unwrap_or_else(|e| e.into_inner());
        *page = entries.into_iter().map(Into::into).collect();
    }

    /// Number of times `fetch_recent` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FeedSource for ScriptedFeed {
    fn fetch_recent<'a>(&'a self, _account: &'a str, limit: usize) -> PostStream<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page: Vec<Entry> = {
            let guard = self.page.lock().unwrap_or_else(|e| e.into_inner());
            guard.iter().take(limit).cloned().collect()
        };

        let mut failed = false;
        let items = page.into_iter().filter_map(move |entry| {
            if failed {
                return None;
            }
            match entry {
                Entry::Post(p) => Some(Ok(p)),
                Entry::Fail(msg) => {
                    failed = true;
                    Some(Err(FetchError::Source(msg)))
                }
            }
        });
        Box::pin(stream::iter(items))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
