//! feed-hook: binary entrypoint.
//! Parses flags, wires the feed, webhook and shutdown signal, then runs the
//! scan loop until a signal arrives or a scan fails.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_hook::config::Cli;
use feed_hook::scanner::{Watermark, WatermarkScanner};
use feed_hook::{metrics, runner, shutdown, WebhookNotifier};

/// `RUST_LOG` wins; otherwise info for this crate, debug with `--verbose`.
fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose {
        "feed_hook=debug,info"
    } else {
        "feed_hook=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; missing file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    if let Some(addr) = cli.metrics_addr {
        metrics::install_exporter(addr)?;
    }

    let feed = cli.feed_source().context("building feed client")?;
    let notifier =
        WebhookNotifier::new(cli.webhook.to_config()).context("building webhook client")?;
    let scanner = WatermarkScanner::new(feed, notifier).with_page_size(cli.page_size);

    let ctx = shutdown::on_signals();
    let query = cli.query();

    let top = runner::run(&scanner, &query, Watermark::startup(), cli.interval(), &ctx)
        .await
        .with_context(|| format!("watching {}", query.account))?;

    tracing::info!(watermark = %top, "shut down cleanly");
    Ok(())
}
