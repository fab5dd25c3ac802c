//! Strategy — compiled extraction rules and the catalog serving them.

pub mod catalog;
pub mod model;
pub mod time_format;

pub use catalog::{StaticCatalog, StrategyCatalog, StrategySnapshot};
pub use model::{CompileError, Strategy, StrategyConfig};
pub use time_format::TimeFormat;
