//! Extraction pipeline — turns one line into at most one [`AnalysPoint`]
//! for one strategy.
//!
//! Stages, in order:
//!
//! 1. locate and parse the timestamp (hard error on failure or future time)
//! 2. disorder bookkeeping against the worker's [`TemporalState`]
//! 3. value extraction (never fails; falls back to NaN or -1)
//! 4. exclusion (skip)
//! 5. tag extraction, all-or-nothing (skip)
//!
//! Stage 2 runs before the skip stages, so excluded lines still advance the
//! file's freshness.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use tracing::debug;

use super::error::PipelineError;
use super::freshness::{FreshnessObserver, TemporalState};
use super::point::AnalysPoint;
use crate::strategy::Strategy;

/// Log timestamps carry no zone; they are read as UTC+8.
pub const LOG_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Value used when a value pattern is configured but does not match.
pub const VALUE_NO_MATCH: f64 = -1.0;

pub fn log_timezone() -> FixedOffset {
    FixedOffset::east_opt(LOG_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Run every stage for one line and one strategy.
///
/// `Ok(None)` is a deliberate skip (excluded or incomplete tags).
pub fn produce(
    line: &str,
    strategy: &Strategy,
    temporal: &mut TemporalState,
    observer: &dyn FreshnessObserver,
    now: DateTime<Utc>,
) -> Result<Option<AnalysPoint>, PipelineError> {
    let tms = parse_timestamp(line, strategy, now)?;

    if let Some((tms, delay)) = temporal.observe(tms) {
        if delay > 0 {
            debug!(
                "[timestamp disorder][sid:{}][latest:{}][producing:{}]",
                strategy.id, temporal.latest_tms, tms
            );
        }
        observer.record_observation(tms, delay);
    }

    let value = extract_value(line, strategy);

    if let Some(exclude) = &strategy.exclude {
        if exclude.excludes(line) {
            return Ok(None);
        }
    }

    let Some(tags) = extract_tags(line, strategy) else {
        return Ok(None);
    };

    Ok(Some(AnalysPoint {
        strategy_id: strategy.id,
        value,
        tms: now.timestamp(),
        tags,
    }))
}

/// Stage 1: locate the timestamp with the strategy's time pattern and parse
/// it in the log timezone. Returns unix seconds.
pub fn parse_timestamp(
    line: &str,
    strategy: &Strategy,
    now: DateTime<Utc>,
) -> Result<i64, PipelineError> {
    let (Some(format), Some(time_reg)) = (strategy.time_format, strategy.time_reg.as_ref()) else {
        return Err(PipelineError::MissingTimeFormat { id: strategy.id });
    };

    let located = time_reg
        .find(line)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PipelineError::NoTimestamp {
            id: strategy.id,
            name: strategy.name.clone(),
            format: format.descriptor().to_string(),
        })?;

    let tz = log_timezone();

    // Year-less layouts borrow the current year. Their day field is padded
    // inconsistently ("Dec  7" vs "Dec 7"), so whitespace runs are collapsed.
    let raw = if format.has_year() {
        located.to_string()
    } else {
        let year = now.with_timezone(&tz).year();
        let collapsed = located.split_whitespace().collect::<Vec<_>>().join(" ");
        format!("{} {}", year, collapsed)
    };

    let naive = NaiveDateTime::parse_from_str(&raw, format.chrono_format()).map_err(|source| {
        PipelineError::TimeParse {
            raw: raw.clone(),
            format: format.chrono_format(),
            source,
        }
    })?;

    let tms = tz
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| PipelineError::InvalidLocalTime { raw: raw.clone() })?
        .timestamp();

    let current = now.timestamp();
    if tms > current {
        debug!(
            "[illegal timestamp][sid:{}][tms:{}][current:{}]",
            strategy.id, tms, current
        );
        return Err(PipelineError::FutureTimestamp { tms, now: current });
    }

    Ok(tms)
}

/// Stage 3: the metric value.
///
/// - no value pattern: NaN
/// - pattern does not match: -1
/// - match without a capture group, or a non-numeric capture: NaN
/// - otherwise the first capture parsed as `f64`
pub fn extract_value(line: &str, strategy: &Strategy) -> f64 {
    let Some(reg) = &strategy.pattern_reg else {
        return f64::NAN;
    };

    match reg.captures(line) {
        None => VALUE_NO_MATCH,
        Some(caps) => caps
            .get(1)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(f64::NAN),
    }
}

/// Stage 5: every declared tag must resolve to its first capture group.
/// Returns `None` when any tag is missing a pattern or fails to match.
pub fn extract_tags(line: &str, strategy: &Strategy) -> Option<BTreeMap<String, String>> {
    let mut tags = BTreeMap::new();
    for name in strategy.tags.keys() {
        let Some(reg) = strategy.tag_regs.get(name) else {
            debug!("[tag pattern missing][sid:{}][tag:{}]", strategy.id, name);
            return None;
        };

        let caps = reg.captures(line)?;
        if caps.len() < 2 {
            return None;
        }
        let value = caps.get(1).map_or("", |m| m.as_str());
        tags.insert(name.clone(), value.to_string());
    }
    Some(tags)
}
