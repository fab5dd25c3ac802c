//! Service — long-running background jobs that sit beside the worker pools.

pub mod background;

pub use background::background_freshness_reset;
