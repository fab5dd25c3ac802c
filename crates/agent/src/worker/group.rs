//! Group — a fixed pool of workers for one file plus the file-level
//! freshness aggregate they report into.

use std::sync::Arc;

use tracing::{error, info};

use super::freshness::{FileFreshness, FreshnessObserver};
use super::worker::{Worker, WorkerDeps, WorkerHandle, WorkerStatus};

pub struct WorkerGroup {
    file_path: String,
    worker_num: usize,
    freshness: Arc<FileFreshness>,
    pending: Vec<Worker>,
    running: Vec<WorkerHandle>,
}

impl WorkerGroup {
    /// Build `worker_num` workers sharing `stream` and one freshness
    /// aggregate. Nothing runs until [`start`](Self::start).
    pub fn new(
        file_path: &str,
        stream: flume::Receiver<String>,
        worker_num: usize,
        deps: WorkerDeps,
    ) -> Self {
        info!("new worker group, [file:{}][worker_num:{}]", file_path, worker_num);

        let freshness = Arc::new(FileFreshness::new());
        let pending = (0..worker_num)
            .map(|id| {
                let observer: Arc<dyn FreshnessObserver> = freshness.clone();
                Worker::new(file_path, id, worker_num, stream.clone(), observer, deps.clone())
            })
            .collect();

        Self {
            file_path: file_path.to_string(),
            worker_num,
            freshness,
            pending,
            running: Vec::new(),
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn worker_num(&self) -> usize {
        self.worker_num
    }

    pub fn is_running(&self) -> bool {
        !self.running.is_empty()
    }

    /// Spawn every pending worker. Returns immediately.
    pub fn start(&mut self) {
        for worker in self.pending.drain(..) {
            self.running.push(worker.start());
        }
    }

    /// Cancel every worker and wait until all of them have exited.
    /// Lines still queued are left in the queue.
    pub async fn stop(&mut self) {
        for handle in &self.running {
            handle.close.cancel();
        }
        self.join().await;
        // Workers that never started are dropped as well.
        self.pending.clear();
    }

    /// Wait for running workers to exit on their own (queue closed and drained).
    pub async fn join(&mut self) {
        for handle in self.running.drain(..) {
            if let Err(e) = handle.join.await {
                error!("{} -- worker task failed: {}", handle.mark, e);
            }
        }
    }

    /// Fold one worker observation into the file-level aggregate.
    pub fn record_observation(&self, tms: i64, delay: i64) {
        self.freshness.record_observation(tms, delay);
    }

    /// Zero the max disorder if a day has passed since the last reset.
    pub fn reset_max_delay(&self) -> bool {
        let reset = self.freshness.reset_max_delay();
        if reset {
            info!("[file:{}] max_delay reset", self.file_path);
        }
        reset
    }

    pub fn latest_tms_and_delay(&self) -> (i64, i64) {
        self.freshness.latest_tms_and_delay()
    }

    pub fn freshness(&self) -> Arc<FileFreshness> {
        Arc::clone(&self.freshness)
    }

    /// Number of workers currently in the middle of a line.
    pub fn analyzing_count(&self) -> usize {
        self.statuses().iter().filter(|(_, s)| s.is_analyzing()).count()
    }

    /// `(mark, status)` for every worker, started or not.
    pub fn statuses(&self) -> Vec<(String, Arc<WorkerStatus>)> {
        self.pending
            .iter()
            .map(|w| (w.mark().to_string(), w.status()))
            .chain(
                self.running
                    .iter()
                    .map(|h| (h.mark.clone(), Arc::clone(&h.status))),
            )
            .collect()
    }
}
