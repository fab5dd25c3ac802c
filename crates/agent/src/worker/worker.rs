//! Worker — drains the shared line queue and runs every applicable strategy
//! against each line.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::freshness::{FreshnessObserver, TemporalState};
use super::pipeline::produce;
use crate::metrics::MetricsSink;
use crate::sample_log::SAMPLE_TARGET;
use crate::strategy::StrategyCatalog;

/// Collaborators shared by every worker of a group.
#[derive(Clone)]
pub struct WorkerDeps {
    pub catalog: Arc<dyn StrategyCatalog>,
    pub sink: Arc<dyn MetricsSink>,
    pub telemetry_interval: Duration,
}

/// Diagnostic view of a worker, readable from outside its task.
#[derive(Debug, Default)]
pub struct WorkerStatus {
    analyzing: AtomicBool,
    counter: AtomicU64,
    latest_tms: AtomicI64,
    delay: AtomicI64,
}

impl WorkerStatus {
    pub fn is_analyzing(&self) -> bool {
        self.analyzing.load(Ordering::Relaxed)
    }

    /// Lines consumed since the worker was created.
    pub fn processed(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Mirror of the worker's [`TemporalState`] after its last line.
    pub fn temporal(&self) -> TemporalState {
        TemporalState {
            latest_tms: self.latest_tms.load(Ordering::Relaxed),
            delay: self.delay.load(Ordering::Relaxed),
        }
    }
}

pub struct Worker {
    file_path: String,
    mark: String,
    stream: flume::Receiver<String>,
    close: CancellationToken,
    status: Arc<WorkerStatus>,
    temporal: TemporalState,
    observer: Arc<dyn FreshnessObserver>,
    deps: WorkerDeps,
}

/// A started worker: what the group keeps to stop and inspect it.
pub struct WorkerHandle {
    pub mark: String,
    pub close: CancellationToken,
    pub status: Arc<WorkerStatus>,
    pub join: JoinHandle<()>,
}

impl Worker {
    pub fn new(
        file_path: &str,
        id: usize,
        worker_num: usize,
        stream: flume::Receiver<String>,
        observer: Arc<dyn FreshnessObserver>,
        deps: WorkerDeps,
    ) -> Self {
        Self {
            file_path: file_path.to_string(),
            mark: format!("[worker][file:{}][num:{}][id:{}]", file_path, worker_num, id),
            stream,
            close: CancellationToken::new(),
            status: Arc::new(WorkerStatus::default()),
            temporal: TemporalState::default(),
            observer,
            deps,
        }
    }

    pub fn mark(&self) -> &str {
        &self.mark
    }

    pub fn status(&self) -> Arc<WorkerStatus> {
        Arc::clone(&self.status)
    }

    pub fn temporal(&self) -> TemporalState {
        self.temporal
    }

    /// Spawn the worker loop onto the runtime.
    pub fn start(self) -> WorkerHandle {
        let mark = self.mark.clone();
        let close = self.close.clone();
        let status = Arc::clone(&self.status);
        let join = tokio::spawn(self.work());
        WorkerHandle {
            mark,
            close,
            status,
            join,
        }
    }

    /// Run until cancelled or the queue is gone. Never panics outward: a
    /// fault in the loop itself is caught, logged, and ends the worker.
    pub async fn work(mut self) {
        let mark = self.mark.clone();
        guarded(&mark, self.run()).await;
    }

    async fn run(&mut self) {
        info!("worker starting...[{}]", self.mark);

        let telemetry_stop = CancellationToken::new();
        let telemetry = tokio::spawn(report_throughput(
            self.file_path.clone(),
            Arc::clone(&self.status),
            Arc::clone(&self.deps.sink),
            self.deps.telemetry_interval,
            telemetry_stop.clone(),
        ));
        // Also fires if the loop below unwinds.
        let _telemetry_guard = telemetry_stop.clone().drop_guard();

        loop {
            tokio::select! {
                biased;
                _ = self.close.cancelled() => break,
                line = self.stream.recv_async() => match line {
                    Ok(line) => self.handle_line(&line),
                    Err(_) => {
                        info!("{} input queue closed", self.mark);
                        break;
                    }
                },
            }
        }

        telemetry_stop.cancel();
        if let Err(e) = telemetry.await {
            error!("{} telemetry task failed: {}", self.mark, e);
        }
    }

    fn handle_line(&mut self, line: &str) {
        self.status.analyzing.store(true, Ordering::Relaxed);
        self.status.counter.fetch_add(1, Ordering::Relaxed);

        if let Err(reason) = panic::catch_unwind(AssertUnwindSafe(|| self.analysis(line))) {
            error!("{}[analysis panic] : {}", self.mark, panic_message(reason.as_ref()));
        }

        self.status.analyzing.store(false, Ordering::Relaxed);
    }

    /// Run `line` through every strategy bound to this worker's file.
    /// Returns the number of points pushed downstream.
    pub fn analysis(&mut self, line: &str) -> usize {
        let strategies = self.deps.catalog.get_all();
        let now = Utc::now();
        let mut produced = 0;

        for strategy in strategies.iter().filter(|s| s.applies_to(&self.file_path)) {
            match produce(line, strategy, &mut self.temporal, self.observer.as_ref(), now) {
                Ok(Some(point)) => {
                    self.deps.sink.metric_analysis_succ(&self.file_path, 1);
                    if let Err(e) = self.deps.sink.push_to_count(point) {
                        error!("{} push to counter error: {}", self.mark, e);
                        continue;
                    }
                    produced += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    self.deps.sink.metric_analysis_fail(&self.file_path, 1);
                    // Fixed message; the sample throttle keys on it.
                    error!(
                        target: SAMPLE_TARGET,
                        mark = %self.mark,
                        sid = strategy.id,
                        error = %e,
                        "producer error"
                    );
                }
            }
        }

        self.status.latest_tms.store(self.temporal.latest_tms, Ordering::Relaxed);
        self.status.delay.store(self.temporal.delay, Ordering::Relaxed);
        produced
    }
}

/// How a worker loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum QuitReason {
    Normal,
    Panic(String),
}

/// Drive `run` to completion, turning a panic into a logged [`QuitReason`].
async fn guarded<F: Future<Output = ()>>(mark: &str, run: F) -> QuitReason {
    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(()) => {
            info!("{} -- worker quit: normally", mark);
            QuitReason::Normal
        }
        Err(reason) => {
            let reason = panic_message(reason.as_ref());
            error!("{} -- worker quit: panic reason: {}", mark, reason);
            QuitReason::Panic(reason)
        }
    }
}

/// Reports the number of lines consumed since the previous tick.
async fn report_throughput(
    file_path: String,
    status: Arc<WorkerStatus>,
    sink: Arc<dyn MetricsSink>,
    period: Duration,
    stop: CancellationToken,
) {
    let mut reported = 0u64;
    loop {
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = tokio::time::sleep(period) => {}
        }
        let current = status.processed();
        sink.metric_analysis(&file_path, current.saturating_sub(reported));
        reported = current;
    }
}

fn panic_message(reason: &(dyn Any + Send)) -> String {
    if let Some(s) = reason.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = reason.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CounterSink, SinkError};
    use crate::strategy::{StaticCatalog, StrategyConfig, StrategySnapshot};
    use crate::worker::{AnalysPoint, FileFreshness};
    use std::collections::BTreeMap;

    const FILE: &str = "/var/log/app.log";

    fn config(id: i64, file_path: &str, pattern: Option<&str>) -> StrategyConfig {
        StrategyConfig {
            id,
            name: format!("s{}", id),
            file_path: file_path.to_string(),
            time_format: "yyyy-mm-dd HH:MM:SS".to_string(),
            pattern: pattern.map(str::to_string),
            exclude: None,
            tags: BTreeMap::new(),
        }
    }

    fn deps(catalog: Arc<dyn StrategyCatalog>, sink: Arc<dyn MetricsSink>) -> WorkerDeps {
        WorkerDeps {
            catalog,
            sink,
            telemetry_interval: Duration::from_secs(10),
        }
    }

    fn worker(
        catalog: Arc<dyn StrategyCatalog>,
        sink: Arc<dyn MetricsSink>,
    ) -> (Worker, flume::Sender<String>, Arc<FileFreshness>) {
        let (tx, rx) = flume::unbounded();
        let freshness = Arc::new(FileFreshness::new());
        let w = Worker::new(FILE, 0, 1, rx, freshness.clone(), deps(catalog, sink));
        (w, tx, freshness)
    }

    #[test]
    fn test_mark_format() {
        let (w, _tx, _) = worker(
            Arc::new(StaticCatalog::default()),
            Arc::new(CounterSink::new()),
        );
        assert_eq!(w.mark(), "[worker][file:/var/log/app.log][num:1][id:0]");
    }

    #[test]
    fn test_analysis_applies_only_matching_valid_strategies() {
        let catalog = Arc::new(StaticCatalog::from_configs(&[
            config(1, FILE, Some(r"cost=(\d+)")),
            config(2, "/var/log/other.log", Some(r"cost=(\d+)")),
            StrategyConfig {
                time_format: "bogus".to_string(),
                ..config(3, FILE, None)
            },
            config(4, FILE, None),
        ]));
        let sink = Arc::new(CounterSink::new());
        let (mut w, _tx, freshness) = worker(catalog, sink.clone());

        let produced = w.analysis("2020-01-01 00:00:00 cost=12");

        assert_eq!(produced, 2);
        assert_eq!(sink.last_point(1).unwrap().value, 12.0);
        assert!(sink.last_point(4).unwrap().value.is_nan());
        assert!(sink.last_point(2).is_none());
        assert!(sink.last_point(3).is_none());
        assert_eq!(sink.snapshot().file(FILE).succ, 2);

        let expected = w.temporal().latest_tms;
        assert!(expected > 0);
        assert_eq!(freshness.latest_tms_and_delay(), (expected, 0));
    }

    #[test]
    fn test_error_on_one_strategy_does_not_stop_others() {
        let catalog = Arc::new(StaticCatalog::from_configs(&[
            StrategyConfig {
                time_format: "yyyy/mm/dd HH:MM:SS".to_string(),
                ..config(1, FILE, None)
            },
            config(2, FILE, Some(r"v=(\d+)")),
        ]));
        let sink = Arc::new(CounterSink::new());
        let (mut w, _tx, _) = worker(catalog, sink.clone());

        assert_eq!(w.analysis("2020-01-01 00:00:00 v=5"), 1);
        assert_eq!(sink.last_point(2).unwrap().value, 5.0);
        let file = sink.snapshot().file(FILE);
        assert_eq!(file.fail, 1);
        assert_eq!(file.succ, 1);
    }

    struct FailingSink;

    impl MetricsSink for FailingSink {
        fn push_to_count(&self, _point: AnalysPoint) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }
        fn metric_analysis(&self, _file_path: &str, _count: u64) {}
        fn metric_analysis_succ(&self, _file_path: &str, _count: u64) {}
    }

    #[test]
    fn test_sink_failure_drops_point() {
        let catalog = Arc::new(StaticCatalog::from_configs(&[config(1, FILE, None)]));
        let (mut w, _tx, _) = worker(catalog, Arc::new(FailingSink));
        assert_eq!(w.analysis("2020-01-01 00:00:00"), 0);
    }

    struct PanickingCatalog;

    impl StrategyCatalog for PanickingCatalog {
        fn get_all(&self) -> StrategySnapshot {
            panic!("catalog exploded")
        }
    }

    #[test]
    fn test_panic_in_analysis_is_contained() {
        let (mut w, _tx, _) = worker(Arc::new(PanickingCatalog), Arc::new(CounterSink::new()));
        w.handle_line("2020-01-01 00:00:00");
        w.handle_line("2020-01-01 00:00:01");

        let status = w.status();
        assert_eq!(status.processed(), 2);
        assert!(!status.is_analyzing());
    }

    #[tokio::test]
    async fn test_worker_drains_until_queue_closes() {
        let catalog = Arc::new(StaticCatalog::from_configs(&[config(1, FILE, Some(r"v=(\d+)"))]));
        let sink = Arc::new(CounterSink::new());
        let (w, tx, freshness) = worker(catalog, sink.clone());

        for line in [
            "2020-01-01 00:00:10 v=1",
            "2020-01-01 00:00:05 v=2",
            "2020-01-01 00:00:20 v=3",
        ] {
            tx.send(line.to_string()).unwrap();
        }
        drop(tx);

        let handle = w.start();
        handle.join.await.unwrap();

        assert_eq!(handle.status.processed(), 3);
        assert_eq!(sink.points_for(1), 3);
        assert_eq!(sink.last_point(1).unwrap().value, 3.0);

        let (latest, max_delay) = freshness.latest_tms_and_delay();
        assert_eq!(latest, handle.status.temporal().latest_tms);
        assert_eq!(max_delay, 5);
    }

    #[tokio::test]
    async fn test_cancel_stops_idle_worker() {
        let (w, _tx, _) = worker(
            Arc::new(StaticCatalog::default()),
            Arc::new(CounterSink::new()),
        );
        let handle = w.start();
        handle.close.cancel();
        handle.join.await.unwrap();
        assert_eq!(handle.status.processed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_telemetry_reports_deltas() {
        let sink = Arc::new(CounterSink::new());
        let status = Arc::new(WorkerStatus::default());
        let stop = CancellationToken::new();
        let task = tokio::spawn(report_throughput(
            FILE.to_string(),
            status.clone(),
            sink.clone(),
            Duration::from_secs(10),
            stop.clone(),
        ));

        status.counter.fetch_add(4, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(sink.snapshot().file(FILE).analysed, 4);

        status.counter.fetch_add(3, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.snapshot().file(FILE).analysed, 7);

        stop.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_guard_reports_normal_quit() {
        assert_eq!(guarded("[worker]", async {}).await, QuitReason::Normal);
    }

    #[tokio::test]
    async fn test_guard_contains_panic_outside_line_handling() {
        let reason = guarded("[worker]", async {
            tokio::task::yield_now().await;
            panic!("loop exploded");
        })
        .await;
        assert_eq!(reason, QuitReason::Panic("loop exploded".to_string()));
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
