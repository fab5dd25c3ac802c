//! JSON-lines sink — writes every point as one JSON object per line.

use std::io::Write;

use parking_lot::Mutex;
use tracing::debug;

use super::counter::CounterSink;
use super::sink::{MetricsSink, SinkError};
use crate::worker::AnalysPoint;

/// Serializes points to a writer and keeps in-process counters alongside.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
    counters: CounterSink,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            counters: CounterSink::new(),
        }
    }

    pub fn counters(&self) -> &CounterSink {
        &self.counters
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> MetricsSink for JsonLinesSink<W> {
    fn push_to_count(&self, point: AnalysPoint) -> Result<(), SinkError> {
        let mut encoded = serde_json::to_vec(&point)?;
        encoded.push(b'\n');
        self.writer.lock().write_all(&encoded)?;
        self.counters.push_to_count(point)
    }

    fn metric_analysis(&self, file_path: &str, count: u64) {
        debug!("[analysis][file:{}][lines:{}]", file_path, count);
        self.counters.metric_analysis(file_path, count);
    }

    fn metric_analysis_succ(&self, file_path: &str, count: u64) {
        self.counters.metric_analysis_succ(file_path, count);
    }

    fn metric_analysis_fail(&self, file_path: &str, count: u64) {
        self.counters.metric_analysis_fail(file_path, count);
    }
}
