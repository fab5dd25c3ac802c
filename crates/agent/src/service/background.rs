use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::worker::FileFreshness;

/// Background task that keeps a file's max disorder meaningful.
///
/// Every `interval` it asks the freshness aggregate to zero `max_delay`
/// once a day has elapsed since the previous reset, so a single burst of
/// out-of-order lines does not pin the reported disorder forever. The
/// current `(latest_tms, max_delay)` pair is logged every `log_every`
/// checks.
///
/// Returns when `close` is cancelled.
pub async fn background_freshness_reset(
    file_path: String,
    freshness: Arc<FileFreshness>,
    interval: Duration,
    close: CancellationToken,
) {
    info!(
        "Starting background freshness reset for {} (interval: {:?})",
        file_path, interval
    );

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let log_every = log_every(interval);
    let mut check_count: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = close.cancelled() => break,
            _ = ticker.tick() => {}
        }
        check_count = check_count.saturating_add(1);

        if freshness.reset_max_delay() {
            info!("[file:{}] max_delay reset", file_path);
        }

        if check_count % log_every == 0 {
            let (latest_tms, max_delay) = freshness.latest_tms_and_delay();
            info!(
                "[file:{}] freshness check #{}: latest_tms={} max_delay={}",
                file_path, check_count, latest_tms, max_delay
            );
        }
    }

    debug!("background freshness reset for {} stopped", file_path);
}

// Roughly one summary line every ten minutes.
fn log_every(interval: Duration) -> u64 {
    (600 / interval.as_secs().max(1)).max(1)
}
