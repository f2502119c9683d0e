// src/feed/rss.rs
use std::time::Duration;

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;

use super::{normalize_plain_text, normalize_text, FeedSource, Post, PostStream};
use crate::error::FetchError;

/// Placeholder replaced by the account name in feed URL templates.
pub const ACCOUNT_PLACEHOLDER: &str = "{account}";

const PINNED_CATEGORY: &str = "pinned";
const PINNED_TITLE_PREFIX: &str = "Pinned:";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<String>,
}

impl Item {
    fn into_post(self, position: usize) -> Result<Post, FetchError> {
        let raw_date = self.pub_date.ok_or_else(|| FetchError::InvalidPost {
            position,
            reason: "missing pubDate".to_string(),
        })?;
        let observed_at = parse_rfc2822(&raw_date).ok_or_else(|| FetchError::InvalidPost {
            position,
            reason: format!("unparsable pubDate {raw_date:?}"),
        })?;

        // Titles are plain text; only descriptions carry markup.
        let title = self.title.as_deref().map(str::trim).unwrap_or_default();
        let pinned_by_title = title.starts_with(PINNED_TITLE_PREFIX);
        let title = title.trim_start_matches(PINNED_TITLE_PREFIX);
        let text = if title.trim().is_empty() {
            normalize_text(self.description.as_deref().unwrap_or_default())
        } else {
            normalize_plain_text(title)
        };

        let is_pinned = pinned_by_title
            || self
                .categories
                .iter()
                .any(|c| c.trim().eq_ignore_ascii_case(PINNED_CATEGORY));

        Ok(Post {
            text,
            observed_at,
            is_pinned,
        })
    }
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Reads an account's posts from an RSS 2.0 document, one post per `<item>`.
pub struct RssFeedSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url_template: String,
        client: reqwest::Client,
    },
}

impl RssFeedSource {
    /// Serve a fixed document regardless of account.
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    /// Download the document from `url_template`, with `{account}` substituted.
    pub fn from_url(url_template: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(url_template, client))
    }

    pub fn with_client(url_template: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url_template: url_template.into(),
                client,
            },
        }
    }

    async fn load(&self, account: &str) -> Result<String, FetchError> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http {
                url_template,
                client,
            } => {
                let url = url_template.replace(ACCOUNT_PLACEHOLDER, account);
                tracing::trace!(%url, "fetching feed");
                let resp = client.get(&url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Status(status));
                }
                Ok(resp.text().await?)
            }
        }
    }
}

fn parse_items(s: &str) -> Result<Vec<Item>, FetchError> {
    let xml_clean = scrub_html_entities_for_xml(s);
    let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(rss.channel.item)
}

impl FeedSource for RssFeedSource {
    fn fetch_recent<'a>(&'a self, account: &'a str, limit: usize) -> PostStream<'a> {
        Box::pin(async_stream::stream! {
            let body = match self.load(account).await {
                Ok(body) => body,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let items = match parse_items(&body) {
                Ok(items) => items,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for (position, item) in items.into_iter().take(limit).enumerate() {
                match item.into_post(position) {
                    Ok(post) => yield Ok(post),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
