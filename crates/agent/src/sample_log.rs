//! Sample log — rate-limited logging for per-line extraction failures.
//!
//! A noisy strategy can fail on every single line. Workers log those
//! failures under [`SAMPLE_TARGET`] with structured fields and a fixed
//! message, so they all share one throttle signature; the subscriber routes
//! that target through a [`TracingRateLimitLayer`] holding a time-window
//! policy.

use std::time::Duration;

use thiserror::Error;
use tracing::Metadata;
use tracing_throttle::{Policy, TracingRateLimitLayer};

use crate::conf::SampleLogConfig;

/// Target of every sampled extraction error.
pub const SAMPLE_TARGET: &str = "sample";

#[derive(Debug, Error)]
pub enum SampleLogError {
    #[error("Invalid sample log policy: {0}")]
    Policy(String),

    #[error("Failed to build sample log limiter: {0}")]
    Build(String),
}

/// Whether an event belongs to the sampled stream.
pub fn is_sample(meta: &Metadata<'_>) -> bool {
    meta.target() == SAMPLE_TARGET
}

/// Rate limiter admitting `max_per_window` sampled events per window.
/// Suppressed counts are summarised once per window.
pub fn rate_limit(config: &SampleLogConfig) -> Result<TracingRateLimitLayer, SampleLogError> {
    let window = Duration::from_secs(config.window_secs.max(1));
    let policy = Policy::time_window(config.max_per_window, window)
        .map_err(|e| SampleLogError::Policy(e.to_string()))?;

    TracingRateLimitLayer::builder()
        .with_policy(policy)
        .with_summary_interval(window)
        .build()
        .map_err(|e| SampleLogError::Build(e.to_string()))
}
