use thiserror::Error;

/// Hard per-strategy extraction failures. Deliberate skips are not errors;
/// they surface as `Ok(None)` from the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No timestamp found [sid:{id}][name:{name}][format:{format}]")]
    NoTimestamp {
        id: i64,
        name: String,
        format: String,
    },

    #[error("Strategy has no usable time format [sid:{id}]")]
    MissingTimeFormat { id: i64 },

    #[error("Failed to parse timestamp {raw:?} as {format:?}: {source}")]
    TimeParse {
        raw: String,
        format: &'static str,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Timestamp {raw:?} does not map to a single instant")]
    InvalidLocalTime { raw: String },

    #[error("Timestamp {tms} is ahead of current time {now}")]
    FutureTimestamp { tms: i64, now: i64 },
}
