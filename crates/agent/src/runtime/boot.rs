//! Boot — config load and logging init.

use tracing::info;
use tracing_subscriber::filter::{filter_fn, FilterExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::conf::{AgentConfig, SampleLogConfig};
use crate::sample_log::{self, is_sample};

/// Initialise the tracing / logging subsystem.
///
/// Logs go to stderr; stdout carries the emitted points. Sampled extraction
/// errors get their own fmt layer behind the rate limiter.
pub fn init_logging(sample: &SampleLogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let limiter = sample_log::rate_limit(sample)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logmetric_agent=info,sample=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter_fn(|meta| !is_sample(meta))),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter_fn(is_sample).and(limiter)),
        )
        .try_init()?;
    Ok(())
}

/// Load and validate the configuration, then bring up logging with the
/// configured sample log policy.
///
/// Config errors surface through the returned error since no subscriber
/// exists yet.
pub fn boot() -> Result<AgentConfig, Box<dyn std::error::Error>> {
    let config = AgentConfig::load()?;
    init_logging(&config.sample_log)?;

    info!("Starting logmetric agent v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Loaded configuration: worker_num={}, strategies={}, telemetry_interval={}s",
        config.worker.worker_num,
        config.strategies.len(),
        config.worker.telemetry_interval_secs
    );
    info!(
        "Sample log: {} errors per {}s window",
        config.sample_log.max_per_window, config.sample_log.window_secs
    );

    Ok(config)
}
