// src/config.rs
//! Command-line / environment configuration.
//!
//! Every flag can also be supplied through a `FEEDHOOK_*` variable; a `.env`
//! file is honoured by the binaries via `dotenvy`.

use std::net::SocketAddr;
use std::time::Duration;

use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;

use crate::error::FetchError;
use crate::feed::rss::{RssFeedSource, ACCOUNT_PLACEHOLDER};
use crate::feed::DEFAULT_PAGE_SIZE;
use crate::notify::WebhookConfig;
use crate::scanner::ScanQuery;

pub const DEFAULT_FEED_URL: &str = "https://nitter.net/{account}/rss";

/// Watch an account's feed and call a webhook for every new post that
/// mentions a keyword.
#[derive(Debug, Clone, Parser)]
#[command(name = "feed-hook", version)]
pub struct Cli {
    /// Account whose posts are watched (leading '@' is ignored)
    #[arg(long, env = "FEEDHOOK_ACCOUNT", value_parser = parse_account)]
    pub account: String,

    /// Keyword to look for, matched case-insensitively
    #[arg(long, env = "FEEDHOOK_FILTER", value_parser = parse_keyword)]
    pub filter: String,

    #[command(flatten)]
    pub webhook: WebhookArgs,

    /// Feed URL template; `{account}` is replaced by the account name
    #[arg(long, env = "FEEDHOOK_FEED_URL", default_value = DEFAULT_FEED_URL, value_parser = parse_feed_template)]
    pub feed_url: String,

    /// Seconds to wait between scans
    #[arg(long, env = "FEEDHOOK_INTERVAL_SECS", default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,

    /// Posts fetched per scan
    #[arg(
        long,
        env = "FEEDHOOK_PAGE_SIZE",
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub page_size: usize,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "FEEDHOOK_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Enable debug logging
    #[arg(short, long, env = "FEEDHOOK_VERBOSE")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "FEEDHOOK_LOG_JSON")]
    pub log_json: bool,
}

/// The outbound call fired for every qualifying post.
#[derive(Debug, Clone, Args)]
pub struct WebhookArgs {
    /// Webhook URL
    #[arg(long, env = "FEEDHOOK_URL")]
    pub url: String,

    /// Webhook HTTP method (GET, POST...)
    #[arg(long, env = "FEEDHOOK_METHOD", default_value = "GET", value_parser = parse_method)]
    pub method: Method,

    /// Request body sent with every call
    #[arg(long, env = "FEEDHOOK_DATA")]
    pub data: Option<String>,

    /// HTTP header, repeatable; the env form takes one header per line
    #[arg(
        long = "header",
        env = "FEEDHOOK_HEADER",
        value_name = "NAME:VALUE",
        value_delimiter = '\n',
        value_parser = parse_header
    )]
    pub headers: Vec<HeaderArg>,

    /// Basic auth user
    #[arg(long, env = "FEEDHOOK_AUTH_USER")]
    pub auth_user: Option<String>,

    /// Basic auth password
    #[arg(long, env = "FEEDHOOK_AUTH_PASS", hide_env_values = true)]
    pub auth_pass: Option<String>,

    /// Webhook request timeout in seconds
    #[arg(long, env = "FEEDHOOK_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderArg {
    pub name: HeaderName,
    pub value: HeaderValue,
}

impl Cli {
    pub fn query(&self) -> ScanQuery {
        ScanQuery::new(&self.account, &self.filter)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn feed_source(&self) -> Result<RssFeedSource, FetchError> {
        if !self.feed_url.contains(ACCOUNT_PLACEHOLDER) {
            tracing::warn!(template = %self.feed_url, "feed url has no {{account}} placeholder");
        }
        RssFeedSource::from_url(&self.feed_url, self.webhook.timeout())
    }
}

impl WebhookArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn to_config(&self) -> WebhookConfig {
        let mut headers = HeaderMap::new();
        for h in &self.headers {
            headers.append(h.name.clone(), h.value.clone());
        }
        WebhookConfig {
            url: self.url.clone(),
            method: self.method.clone(),
            body: self.data.clone().filter(|d| !d.is_empty()),
            headers,
            auth_user: self.auth_user.clone().filter(|u| !u.is_empty()),
            auth_pass: self.auth_pass.clone(),
            timeout: self.timeout(),
        }
    }
}

fn parse_account(s: &str) -> Result<String, String> {
    let account = s.trim().trim_start_matches('@');
    if account.is_empty() {
        return Err("account not provided".to_string());
    }
    Ok(account.to_string())
}

fn parse_keyword(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("filter not provided".to_string());
    }
    Ok(s.to_lowercase())
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("invalid http method {s:?}"))
}

fn parse_header(s: &str) -> Result<HeaderArg, String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("could not parse header value {s:?}, expected NAME:VALUE"))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| format!("invalid header name in {s:?}: {e}"))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| format!("invalid header value in {s:?}: {e}"))?;
    Ok(HeaderArg { name, value })
}

fn parse_feed_template(s: &str) -> Result<String, String> {
    if !s.starts_with("http://") && !s.starts_with("https://") {
        return Err(format!("feed url must be http(s): {s:?}"));
    }
    Ok(s.to_string())
}
