pub mod webhook;

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::NotifyError;

pub use webhook::{WebhookConfig, WebhookNotifier};

/// A pre-bound outbound call. It takes no per-post parameters: every
/// qualifying post fires the same request.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self) -> Result<(), NotifyError>;

    /// Where notifications go, for log lines.
    fn target(&self) -> &str;
}

/// Counts calls instead of sending anything. Optionally starts failing after
/// a fixed number of successful sends.
#[derive(Debug, Default)]
pub struct CountingNotifier {
    sent: AtomicUsize,
    fail_after: Option<usize>,
}

impl CountingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed `n` times, then return an error on every further call.
    pub fn failing_after(n: usize) -> Self {
        Self {
            sent: AtomicUsize::new(0),
            fail_after: Some(n),
        }
    }

    /// Number of successful sends so far.
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Notifier for CountingNotifier {
    async fn send(&self) -> Result<(), NotifyError> {
        let sent = self.sent.load(Ordering::SeqCst);
        if self.fail_after.is_some_and(|n| sent >= n) {
            return Err(NotifyError::Other(format!("refusing send #{}", sent + 1)));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn target(&self) -> &str {
        "counter"
    }
}

#[async_trait::async_trait]
impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    async fn send(&self) -> Result<(), NotifyError> {
        (**self).send().await
    }

    fn target(&self) -> &str {
        (**self).target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counting_notifier_fails_after_limit() {
        let n = CountingNotifier::failing_after(2);
        assert!(n.send().await.is_ok());
        assert!(n.send().await.is_ok());
        assert!(matches!(n.send().await, Err(NotifyError::Other(_))));
        assert_eq!(n.sent(), 2);
    }
}
