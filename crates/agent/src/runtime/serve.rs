//! Serve — wire the catalog, sink and worker group, then feed stdin lines
//! into the group until EOF or shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::conf::{AgentConfig, ConfigError};
use crate::metrics::JsonLinesSink;
use crate::runtime::stop::shutdown_signal;
use crate::service::background_freshness_reset;
use crate::strategy::StaticCatalog;
use crate::worker::{WorkerDeps, WorkerGroup};

/// Lines buffered between the reader and the workers.
const QUEUE_CAPACITY: usize = 4096;

/// Run one worker group over stdin.
///
/// Ctrl+C stops the workers and abandons whatever is still queued. EOF on
/// stdin closes the queue and waits for the workers to drain it.
pub async fn serve(config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    let input_file = config.input_file().map(str::to_string).ok_or_else(|| {
        error!("No input file: set input_file / AGENT_INPUT_FILE or configure a strategy");
        ConfigError::Invalid("no input file".to_string())
    })?;

    let catalog = Arc::new(StaticCatalog::from_configs(&config.strategies));
    let sink = Arc::new(JsonLinesSink::new(std::io::stdout()));
    let deps = WorkerDeps {
        catalog,
        sink: sink.clone(),
        telemetry_interval: Duration::from_secs(config.worker.telemetry_interval_secs),
    };

    let (tx, rx) = flume::bounded(QUEUE_CAPACITY);
    let mut group = WorkerGroup::new(&input_file, rx, config.worker.worker_num, deps);
    group.start();

    let close = CancellationToken::new();
    let job = tokio::spawn(background_freshness_reset(
        input_file.clone(),
        group.freshness(),
        Duration::from_secs(config.freshness.reset_check_interval_secs),
        close.clone(),
    ));

    info!("========================================");
    info!("logmetric agent is ready!");
    info!("Reading lines of {} from stdin", input_file);
    info!("Workers: {}", group.worker_num());
    info!("Press Ctrl+C to shutdown gracefully");
    info!("========================================");

    let feed = feed_lines(BufReader::new(tokio::io::stdin()), &tx, shutdown_signal()).await;

    drop(tx);
    if feed.interrupted {
        group.stop().await;
    } else {
        info!("stdin closed after {} lines, draining queue", feed.fed);
        group.join().await;
    }

    close.cancel();
    if let Err(e) = job.await {
        error!("freshness job failed: {}", e);
    }

    let (latest_tms, max_delay) = group.latest_tms_and_delay();
    info!(
        "[file:{}] latest_tms={} max_delay={}",
        input_file, latest_tms, max_delay
    );
    info!(
        "Final counters: {}",
        serde_json::to_string(&sink.counters().snapshot())?
    );
    info!("Agent shutdown complete");
    Ok(())
}

/// Outcome of feeding the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Feed {
    fed: u64,
    /// Shutdown fired before the input ended.
    interrupted: bool,
}

/// Forward lines from `reader` into `tx` until EOF, a read error, every
/// receiver gone, or `shutdown`. Shutdown is honoured while waiting on a
/// full queue as well as while waiting for input.
async fn feed_lines<R, S>(reader: R, tx: &flume::Sender<String>, shutdown: S) -> Feed
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut lines = reader.lines();
    let mut fed: u64 = 0;

    loop {
        let line = tokio::select! {
            biased;
            _ = &mut shutdown => return Feed { fed, interrupted: true },
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => return Feed { fed, interrupted: true },
                    sent = tx.send_async(line) => {
                        if sent.is_err() {
                            warn!("All workers have quit, no one left to read the queue");
                            return Feed { fed, interrupted: false };
                        }
                    }
                }
                fed = fed.saturating_add(1);
            }
            Ok(None) => return Feed { fed, interrupted: false },
            Err(e) => {
                error!("Failed to read input: {}", e);
                return Feed { fed, interrupted: false };
            }
        }
    }
}
