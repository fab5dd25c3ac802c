use std::collections::BTreeMap;

use serde::Serialize;

/// One extracted observation, produced by a single line / strategy pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysPoint {
    pub strategy_id: i64,
    /// NaN when the strategy has no value pattern or the capture is not numeric.
    /// Serialized as `null` in JSON.
    pub value: f64,
    /// Unix seconds at processing time, not the line's own timestamp.
    pub tms: i64,
    pub tags: BTreeMap<String, String>,
}
