//! Fires the configured webhook once, so the target can be checked before
//! starting a watch. Takes the same webhook flags as `feed-hook`.

use anyhow::{Context, Result};
use clap::Parser;

use feed_hook::config::WebhookArgs;
use feed_hook::{Notifier, WebhookNotifier};

#[derive(Debug, Parser)]
#[command(name = "webhook-probe", version)]
struct ProbeCli {
    #[command(flatten)]
    webhook: WebhookArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cli = ProbeCli::parse();
    let notifier = WebhookNotifier::new(cli.webhook.to_config()).context("building webhook client")?;

    notifier
        .send()
        .await
        .with_context(|| format!("{} {}", cli.webhook.method, notifier.target()))?;

    tracing::info!(method = %cli.webhook.method, url = notifier.target(), "webhook ok");
    println!("webhook-probe done");
    Ok(())
}
