//! Model — AgentConfig and related structs.

use serde::{Deserialize, Serialize};

use crate::strategy::StrategyConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub worker: WorkerConfig,
    pub freshness: FreshnessConfig,
    pub sample_log: SampleLogConfig,
    /// File the stdin lines belong to. Defaults to the first strategy's file.
    pub input_file: Option<String>,
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Workers per monitored file, read once at group construction.
    pub worker_num: usize,
    pub telemetry_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    /// How often the background job checks whether max_delay is due for reset.
    pub reset_check_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleLogConfig {
    /// Sampled extraction errors logged per window; the rest are suppressed.
    pub max_per_window: usize,
    pub window_secs: u64,
}

impl AgentConfig {
    /// The file whose lines arrive on stdin.
    pub fn input_file(&self) -> Option<&str> {
        self.input_file
            .as_deref()
            .or_else(|| self.strategies.first().map(|s| s.file_path.as_str()))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            freshness: FreshnessConfig::default(),
            sample_log: SampleLogConfig::default(),
            input_file: None,
            strategies: Vec::new(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_num: 10,
            telemetry_interval_secs: 10,
        }
    }
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            reset_check_interval_secs: 60,
        }
    }
}

impl Default for SampleLogConfig {
    fn default() -> Self {
        Self {
            max_per_window: 10,
            window_secs: 60,
        }
    }
}
