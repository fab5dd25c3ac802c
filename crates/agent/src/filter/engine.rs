use std::sync::atomic::{AtomicU64, Ordering};
use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid exclude pattern: {0}")]
    InvalidRegex(String),
}

#[derive(Debug, Default)]
pub struct FilterStats {
    pub lines_scanned: AtomicU64,
    pub lines_excluded: AtomicU64,
}

/// Drops lines matching a strategy's exclude pattern.
///
/// Shared by every worker of a file, so the counters are relaxed atomics.
pub struct ExcludeFilter {
    pattern: String,
    matcher: RegexMatcher,
    stats: FilterStats,
}

impl std::fmt::Debug for ExcludeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExcludeFilter")
            .field("pattern", &self.pattern)
            .field("stats", &self.stats)
            .finish()
    }
}

impl ExcludeFilter {
    pub fn new(pattern: &str) -> Result<Self, FilterError> {
        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(false)
            .multi_line(false)
            .build(pattern)
            .map_err(|e| FilterError::InvalidRegex(e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            stats: FilterStats::default(),
        })
    }

    /// True when the line matches and must be skipped.
    #[inline]
    pub fn excludes(&self, line: &str) -> bool {
        self.stats.lines_scanned.fetch_add(1, Ordering::Relaxed);

        let matches = self.matcher.is_match(line.as_bytes()).unwrap_or(false);
        if matches {
            self.stats.lines_excluded.fetch_add(1, Ordering::Relaxed);
        }
        matches
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// `(scanned, excluded)`
    pub fn stats(&self) -> (u64, u64) {
        (
            self.stats.lines_scanned.load(Ordering::Relaxed),
            self.stats.lines_excluded.load(Ordering::Relaxed),
        )
    }
}
