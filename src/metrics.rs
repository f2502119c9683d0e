use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// One-time registration so series show up with help text.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_scans_total", "Scans started.");
        describe_counter!(
            "feed_posts_examined_total",
            "Posts pulled from the feed and classified."
        );
        describe_counter!(
            "feed_posts_skipped_total",
            "Posts passed over without notifying, by reason."
        );
        describe_counter!(
            "feed_notifications_total",
            "Notifications delivered for new matching posts."
        );
        describe_counter!("feed_scan_errors_total", "Scans aborted, by error kind.");
        describe_gauge!(
            "feed_watermark_unix_seconds",
            "Watermark after the last successful scan."
        );
    });
}

/// Serve Prometheus exposition on `addr`. Must run inside a tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("installing prometheus exporter on {addr}"))?;
    ensure_metrics_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
