//! Worker module — the per-file worker pool and the extraction pipeline.
//!
//! - `pipeline.rs`: per-line, per-strategy extraction (pure apart from the
//!   worker's own temporal state)
//! - `freshness.rs`: latest timestamp / disorder tracking
//! - `worker.rs`: queue-draining task with telemetry and fault containment
//! - `group.rs`: fixed-size pool owning the file-level aggregate

pub mod error;
pub mod freshness;
pub mod group;
pub mod pipeline;
pub mod point;
#[allow(clippy::module_inception)]
pub mod worker;

pub use error::PipelineError;
pub use freshness::{FileFreshness, FreshnessObserver, TemporalState};
pub use group::WorkerGroup;
pub use point::AnalysPoint;
pub use worker::{Worker, WorkerDeps, WorkerHandle, WorkerStatus};
