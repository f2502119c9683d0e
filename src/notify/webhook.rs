use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method};

use super::Notifier;
use crate::error::NotifyError;

/// Default per-request timeout for the webhook call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to fire the webhook. Bound once at startup.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub method: Method,
    /// Sent verbatim as the request body when present.
    pub body: Option<String>,
    pub headers: HeaderMap,
    /// Basic auth user; the password may be empty.
    pub auth_user: Option<String>,
    pub auth_pass: Option<String>,
    pub timeout: Duration,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            body: None,
            headers: HeaderMap::new(),
            auth_user: None,
            auth_pass: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Fires the configured HTTP request. Any 2xx counts as delivered.
#[derive(Clone)]
pub struct WebhookNotifier {
    cfg: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(cfg: WebhookConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(NotifyError::Client)?;
        Ok(Self { cfg, client })
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.cfg
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self) -> Result<(), NotifyError> {
        let mut req = self
            .client
            .request(self.cfg.method.clone(), &self.cfg.url)
            .headers(self.cfg.headers.clone());
        if let Some(body) = &self.cfg.body {
            req = req.body(body.clone());
        }
        if let Some(user) = self.cfg.auth_user.as_deref().filter(|u| !u.is_empty()) {
            req = req.basic_auth(user, self.cfg.auth_pass.as_deref());
        }

        let resp = req.send().await.map_err(NotifyError::Transport)?;
        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(%status, url = %self.cfg.url, "webhook rejected");
            return Err(NotifyError::Status(status));
        }
        Ok(())
    }

    fn target(&self) -> &str {
        &self.cfg.url
    }
}
