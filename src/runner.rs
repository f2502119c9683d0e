// src/runner.rs
use std::time::Duration;

use crate::error::ScanError;
use crate::scanner::{ScanQuery, Watermark, WatermarkScanner};
use crate::shutdown::Shutdown;

/// Default wait between the end of one scan and the start of the next.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Scan every `interval` until cancelled or a scan fails.
///
/// The wait only starts after the previous scan returned, so scans never
/// overlap. Cancellation ends the loop with `Ok` and the last watermark; a
/// fetch or notify error ends it with that error.
pub async fn run(
    scanner: &WatermarkScanner,
    query: &ScanQuery,
    start: Watermark,
    interval: Duration,
    ctx: &Shutdown,
) -> Result<Watermark, ScanError> {
    let mut top = start;
    tracing::info!(
        account = %query.account,
        keyword = query.keyword(),
        watermark = %top,
        ?interval,
        "watching feed"
    );

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                tracing::info!(watermark = %top, "stopping");
                return Ok(top);
            }
            _ = tokio::time::sleep(interval) => {}
        }

        match scanner.scan(ctx, query, top).await {
            Ok(report) => top = report.top,
            Err(failure) if failure.error.is_cancelled() => {
                tracing::info!(watermark = %failure.top, "stopping mid-scan");
                return Ok(failure.top);
            }
            Err(failure) => {
                tracing::error!(
                    kind = failure.error.kind(),
                    watermark = %failure.top,
                    error = %failure.error,
                    "scan failed"
                );
                return Err(failure.error);
            }
        }
    }
}
