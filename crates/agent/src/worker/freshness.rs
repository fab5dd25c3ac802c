//! Freshness — latest timestamp and timestamp disorder bookkeeping.
//!
//! Each worker keeps its own [`TemporalState`]. Whenever that state moves it
//! reports to the group's [`FileFreshness`], which folds every worker's view
//! into one file-level pair using compare-and-swap ratchets.

use std::sync::atomic::{AtomicI64, Ordering};

use tracing::debug;

/// Minimum number of seconds between two `max_delay` resets.
pub const MAX_DELAY_RESET_SECS: i64 = 86_400;

/// Receives `(timestamp, delay)` observations from workers.
///
/// Must tolerate unsynchronized concurrent calls from every worker.
pub trait FreshnessObserver: Send + Sync {
    fn record_observation(&self, tms: i64, delay: i64);
}

/// Per-worker view of the file's timeline. Only touched by its own worker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TemporalState {
    /// Most advanced log timestamp this worker has seen (unix seconds).
    pub latest_tms: i64,
    /// Most recent positive disorder this worker measured.
    pub delay: i64,
}

impl TemporalState {
    /// Fold a parsed timestamp into the state.
    ///
    /// Returns the `(tms, delay)` pair to report upstream, or `None` when the
    /// timestamp equals `latest_tms`. `delay` is 0 when the timestamp advanced.
    pub fn observe(&mut self, tms: i64) -> Option<(i64, i64)> {
        if tms > self.latest_tms {
            self.latest_tms = tms;
            Some((tms, 0))
        } else if tms < self.latest_tms {
            let delay = self.latest_tms - tms;
            self.delay = delay;
            Some((tms, delay))
        } else {
            None
        }
    }
}

/// File-level aggregate shared by all workers of a group.
#[derive(Debug, Default)]
pub struct FileFreshness {
    latest_tms: AtomicI64,
    max_delay: AtomicI64,
    reset_tms: AtomicI64,
}

/// Raise `cell` to `value` unless it already holds something at least as large.
/// Returns true when this call stored `value`.
fn ratchet(cell: &AtomicI64, value: i64) -> bool {
    let mut current = cell.load(Ordering::Acquire);
    while value > current {
        match cell.compare_exchange_weak(current, value, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return true,
            Err(actual) => current = actual,
        }
    }
    false
}

impl FileFreshness {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(latest_tms, max_delay)`. The two reads are independent.
    pub fn latest_tms_and_delay(&self) -> (i64, i64) {
        (
            self.latest_tms.load(Ordering::Acquire),
            self.max_delay.load(Ordering::Acquire),
        )
    }

    /// Unix seconds of the last `max_delay` reset, 0 if never reset.
    pub fn last_reset(&self) -> i64 {
        self.reset_tms.load(Ordering::Acquire)
    }

    /// Zero `max_delay` if more than a day has passed since the last reset.
    pub fn reset_max_delay(&self) -> bool {
        self.reset_max_delay_at(chrono::Utc::now().timestamp())
    }

    /// Same as [`reset_max_delay`](Self::reset_max_delay) with an explicit clock.
    /// Returns true when this call performed the reset.
    pub fn reset_max_delay_at(&self, now: i64) -> bool {
        let last = self.reset_tms.load(Ordering::Acquire);
        if now - last <= MAX_DELAY_RESET_SECS {
            return false;
        }
        // Only one concurrent caller wins the window.
        if self
            .reset_tms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.max_delay.store(0, Ordering::Release);
        true
    }
}

impl FreshnessObserver for FileFreshness {
    fn record_observation(&self, tms: i64, delay: i64) {
        if ratchet(&self.latest_tms, tms) {
            debug!("[set latest_tms:{}]", tms);
        }

        if delay <= 0 {
            return;
        }

        if ratchet(&self.max_delay, delay) {
            debug!("[set max_delay:{}]", delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_increasing_sequence_never_reports_delay() {
        let mut state = TemporalState::default();
        for tms in [100, 101, 105, 200] {
            assert_eq!(state.observe(tms), Some((tms, 0)));
            assert_eq!(state.latest_tms, tms);
        }
        assert_eq!(state.delay, 0);
    }

    #[test]
    fn test_disorder_reports_gap_and_keeps_latest() {
        let mut state = TemporalState::default();
        state.observe(1_000);
        assert_eq!(state.observe(970), Some((970, 30)));
        assert_eq!(state.latest_tms, 1_000);
        assert_eq!(state.delay, 30);

        // Gap is always measured against the most advanced timestamp.
        assert_eq!(state.observe(990), Some((990, 10)));
        assert_eq!(state.latest_tms, 1_000);
    }

    #[test]
    fn test_equal_timestamp_is_silent() {
        let mut state = TemporalState::default();
        state.observe(50);
        assert_eq!(state.observe(50), None);
    }

    #[test]
    fn test_record_observation_ratchets() {
        let freshness = FileFreshness::new();
        freshness.record_observation(100, 0);
        freshness.record_observation(90, 10);
        freshness.record_observation(95, 5);
        freshness.record_observation(80, 0);

        assert_eq!(freshness.latest_tms_and_delay(), (100, 10));
    }

    #[test]
    fn test_negative_delay_ignored() {
        let freshness = FileFreshness::new();
        freshness.record_observation(10, -5);
        assert_eq!(freshness.latest_tms_and_delay(), (10, 0));
    }

    #[test]
    fn test_concurrent_observations_keep_maximum() {
        let freshness = Arc::new(FileFreshness::new());
        let handles: Vec<_> = (0..8i64)
            .map(|t| {
                let freshness = Arc::clone(&freshness);
                thread::spawn(move || {
                    for i in 0..1_000i64 {
                        // Non-increasing offers within each thread.
                        let v = 10_000 - i * 8 - t;
                        freshness.record_observation(v, v / 10);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(freshness.latest_tms_and_delay(), (10_000, 1_000));
    }

    #[test]
    fn test_reset_at_most_once_per_window() {
        let freshness = FileFreshness::new();
        let start = 1_700_000_000;
        freshness.record_observation(start, 42);

        assert!(freshness.reset_max_delay_at(start));
        assert_eq!(freshness.latest_tms_and_delay().1, 0);
        assert_eq!(freshness.last_reset(), start);

        freshness.record_observation(start - 7, 7);
        assert!(!freshness.reset_max_delay_at(start + 10));
        assert!(!freshness.reset_max_delay_at(start + MAX_DELAY_RESET_SECS));
        assert_eq!(freshness.latest_tms_and_delay().1, 7);

        assert!(freshness.reset_max_delay_at(start + MAX_DELAY_RESET_SECS + 1));
        assert_eq!(freshness.latest_tms_and_delay().1, 0);
        assert!(!freshness.reset_max_delay_at(start + MAX_DELAY_RESET_SECS + 2));
    }

    #[test]
    fn test_reset_keeps_latest_tms() {
        let freshness = FileFreshness::new();
        freshness.record_observation(500, 20);
        freshness.reset_max_delay_at(MAX_DELAY_RESET_SECS + 1);
        assert_eq!(freshness.latest_tms_and_delay(), (500, 0));
    }
}
