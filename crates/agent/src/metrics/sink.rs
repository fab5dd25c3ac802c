use thiserror::Error;

use crate::worker::AnalysPoint;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink closed")]
    Closed,

    #[error("Failed to encode point: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to write point: {0}")]
    Io(#[from] std::io::Error),
}

/// Downstream consumer of extracted points and throughput counters.
///
/// Called concurrently from every worker; implementations must be cheap and
/// must not block on slow I/O for long.
pub trait MetricsSink: Send + Sync {
    /// Hand a point to the counter pipeline. Errors are logged by the caller
    /// and the point is dropped.
    fn push_to_count(&self, point: AnalysPoint) -> Result<(), SinkError>;

    /// Lines consumed for `file_path` since the previous report.
    fn metric_analysis(&self, file_path: &str, count: u64);

    /// Points successfully extracted for `file_path`.
    fn metric_analysis_succ(&self, file_path: &str, count: u64);

    /// Hard extraction failures for `file_path`.
    fn metric_analysis_fail(&self, _file_path: &str, _count: u64) {}
}
