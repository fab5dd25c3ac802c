//! Model — raw strategy definitions and their compiled form.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::time_format::TimeFormat;
use crate::filter::{ExcludeFilter, FilterError};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Unknown time format: {0:?}")]
    UnknownTimeFormat(String),

    #[error("Invalid value pattern: {0}")]
    Pattern(#[source] regex::Error),

    #[error("Invalid tag pattern for {tag:?}: {source}")]
    Tag {
        tag: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Exclude(#[from] FilterError),
}

/// A strategy as authored in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub id: i64,
    pub name: String,
    pub file_path: String,
    /// One of the [`TimeFormat`] descriptors, e.g. `"yyyy-mm-dd HH:MM:SS"`.
    pub time_format: String,
    /// Value pattern; the first capture group is the metric value.
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub exclude: Option<String>,
    /// Tag name -> pattern; the first capture group is the tag value.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// A compiled strategy, read-only once published to a catalog.
#[derive(Debug)]
pub struct Strategy {
    pub id: i64,
    pub name: String,
    pub file_path: String,
    pub time_format: Option<TimeFormat>,
    pub time_reg: Option<Regex>,
    pub pattern_reg: Option<Regex>,
    pub exclude: Option<ExcludeFilter>,
    /// Declared tag names with their source pattern.
    pub tags: BTreeMap<String, String>,
    pub tag_regs: HashMap<String, Regex>,
    /// False when any pattern failed to compile; such strategies are never applied.
    pub parse_succ: bool,
}

impl StrategyConfig {
    /// Compile into a [`Strategy`]. Failures are logged and produce a
    /// strategy with `parse_succ == false`.
    pub fn compile(&self) -> Strategy {
        match self.try_compile() {
            Ok(strategy) => strategy,
            Err(e) => {
                warn!(
                    "[strategy compile failed][sid:{}][name:{}][file:{}]: {}",
                    self.id, self.name, self.file_path, e
                );
                self.failed()
            }
        }
    }

    pub fn try_compile(&self) -> Result<Strategy, CompileError> {
        let time_format = TimeFormat::from_descriptor(&self.time_format)
            .ok_or_else(|| CompileError::UnknownTimeFormat(self.time_format.clone()))?;

        // Locators are static and covered by tests.
        let time_reg = Regex::new(time_format.locator()).map_err(CompileError::Pattern)?;

        let pattern_reg = self
            .pattern
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Regex::new)
            .transpose()
            .map_err(CompileError::Pattern)?;

        let exclude = self
            .exclude
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(ExcludeFilter::new)
            .transpose()?;

        let mut tag_regs = HashMap::with_capacity(self.tags.len());
        for (tag, pattern) in &self.tags {
            let reg = Regex::new(pattern).map_err(|source| CompileError::Tag {
                tag: tag.clone(),
                source,
            })?;
            tag_regs.insert(tag.clone(), reg);
        }

        Ok(Strategy {
            id: self.id,
            name: self.name.clone(),
            file_path: self.file_path.clone(),
            time_format: Some(time_format),
            time_reg: Some(time_reg),
            pattern_reg,
            exclude,
            tags: self.tags.clone(),
            tag_regs,
            parse_succ: true,
        })
    }

    fn failed(&self) -> Strategy {
        Strategy {
            id: self.id,
            name: self.name.clone(),
            file_path: self.file_path.clone(),
            time_format: TimeFormat::from_descriptor(&self.time_format),
            time_reg: None,
            pattern_reg: None,
            exclude: None,
            tags: self.tags.clone(),
            tag_regs: HashMap::new(),
            parse_succ: false,
        }
    }
}

impl Strategy {
    /// Whether this strategy should run against lines of `file_path`.
    #[inline]
    pub fn applies_to(&self, file_path: &str) -> bool {
        self.parse_succ && self.file_path == file_path
    }
}
