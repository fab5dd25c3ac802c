use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use super::sink::{MetricsSink, SinkError};
use crate::worker::AnalysPoint;

/// Forces the wrapped counters onto their own cache line so that workers
/// bumping different groups do not invalidate each other's L1 lines.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);

/// Point-level totals (hot path, updated per extracted point)
#[derive(Debug, Default)]
pub struct PointTotals {
    pub pushed: AtomicU64,
    pub nan_values: AtomicU64,
}

/// Per-file counters
#[derive(Debug, Default)]
pub struct FileCounters {
    pub analysed: AtomicU64,
    pub succ: AtomicU64,
    pub fail: AtomicU64,
}

/// In-process counter sink.
///
/// Keeps per-file throughput counters and the most recent point per
/// strategy. Useful as the default sink of the binary and in tests; a real
/// deployment would forward points to its metrics backend instead.
///
/// All counter updates use `Ordering::Relaxed`; `snapshot()` is not
/// transactional across fields.
#[derive(Debug, Default)]
pub struct CounterSink {
    points: CacheAligned<PointTotals>,
    files: DashMap<String, FileCounters>,
    per_strategy: DashMap<i64, u64>,
    last_points: DashMap<i64, AnalysPoint>,
}

impl CounterSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self, file_path: &str, count: u64, pick: impl Fn(&FileCounters) -> &AtomicU64) {
        if let Some(counters) = self.files.get(file_path) {
            pick(counters.value()).fetch_add(count, Ordering::Relaxed);
            return;
        }
        let counters = self.files.entry(file_path.to_string()).or_default();
        pick(counters.value()).fetch_add(count, Ordering::Relaxed);
    }

    /// Most recent point pushed for a strategy.
    pub fn last_point(&self, strategy_id: i64) -> Option<AnalysPoint> {
        self.last_points.get(&strategy_id).map(|p| p.clone())
    }

    pub fn points_for(&self, strategy_id: i64) -> u64 {
        self.per_strategy.get(&strategy_id).map(|c| *c).unwrap_or(0)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let files = self
            .files
            .iter()
            .map(|entry| {
                let c = entry.value();
                (
                    entry.key().clone(),
                    FileSnapshot {
                        analysed: c.analysed.load(Ordering::Relaxed),
                        succ: c.succ.load(Ordering::Relaxed),
                        fail: c.fail.load(Ordering::Relaxed),
                    },
                )
            })
            .collect();

        CounterSnapshot {
            pushed: self.points.0.pushed.load(Ordering::Relaxed),
            nan_values: self.points.0.nan_values.load(Ordering::Relaxed),
            files,
        }
    }
}

impl MetricsSink for CounterSink {
    fn push_to_count(&self, point: AnalysPoint) -> Result<(), SinkError> {
        self.points.0.pushed.fetch_add(1, Ordering::Relaxed);
        if point.value.is_nan() {
            self.points.0.nan_values.fetch_add(1, Ordering::Relaxed);
        }
        *self.per_strategy.entry(point.strategy_id).or_insert(0) += 1;
        self.last_points.insert(point.strategy_id, point);
        Ok(())
    }

    fn metric_analysis(&self, file_path: &str, count: u64) {
        self.bump(file_path, count, |c| &c.analysed);
    }

    fn metric_analysis_succ(&self, file_path: &str, count: u64) {
        self.bump(file_path, count, |c| &c.succ);
    }

    fn metric_analysis_fail(&self, file_path: &str, count: u64) {
        self.bump(file_path, count, |c| &c.fail);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileSnapshot {
    pub analysed: u64,
    pub succ: u64,
    pub fail: u64,
}

/// A read-only view of the counters, serializable for logging.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CounterSnapshot {
    pub pushed: u64,
    pub nan_values: u64,
    pub files: BTreeMap<String, FileSnapshot>,
}

impl CounterSnapshot {
    pub fn file(&self, file_path: &str) -> FileSnapshot {
        self.files.get(file_path).cloned().unwrap_or_default()
    }
}
