//! Filter — line exclusion applied after value extraction.

pub mod engine;

pub use engine::{ExcludeFilter, FilterError};
