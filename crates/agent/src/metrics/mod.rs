//! Metrics — the downstream sink contract and in-process implementations.

pub mod counter;
pub mod json;
pub mod sink;

pub use counter::{CounterSink, CounterSnapshot};
pub use json::JsonLinesSink;
pub use sink::{MetricsSink, SinkError};
