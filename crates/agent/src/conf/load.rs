//! Load — config loading from file and environment variables.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use super::model::{AgentConfig, WorkerConfig};
use crate::strategy::TimeFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AgentConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("AGENT_CONFIG_FILE")
            .unwrap_or_else(|_| "/etc/logmetric/agent.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using environment variables", config_path);
            Self::from_env()
        };

        if let Some(worker_num) = env_parse("AGENT_WORKER_NUM") {
            config.worker.worker_num = worker_num;
        }
        if let Ok(input) = std::env::var("AGENT_INPUT_FILE") {
            config.input_file = Some(input);
        }

        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Load configuration from environment variables with sensible defaults.
    /// Strategies can only come from a file.
    pub fn from_env() -> Self {
        Self {
            worker: WorkerConfig::from_env(),
            input_file: std::env::var("AGENT_INPUT_FILE").ok(),
            ..Self::default()
        }
    }

    /// Validate that configuration values are sane
    pub fn validate(&self) -> Result<(), String> {
        if self.worker.worker_num == 0 {
            return Err("worker.worker_num must be > 0".to_string());
        }
        if self.worker.telemetry_interval_secs == 0 {
            return Err("worker.telemetry_interval_secs must be > 0".to_string());
        }
        if self.freshness.reset_check_interval_secs == 0 {
            return Err("freshness.reset_check_interval_secs must be > 0".to_string());
        }
        if self.sample_log.max_per_window == 0 {
            return Err("sample_log.max_per_window must be > 0".to_string());
        }
        if self.sample_log.window_secs == 0 {
            return Err("sample_log.window_secs must be > 0".to_string());
        }

        let mut ids = HashSet::new();
        for strategy in &self.strategies {
            if !ids.insert(strategy.id) {
                return Err(format!("duplicate strategy id {}", strategy.id));
            }
            if strategy.file_path.is_empty() {
                return Err(format!("strategy {} has an empty file_path", strategy.id));
            }
            // Unknown formats are tolerated here; the strategy just never runs.
            if TimeFormat::from_descriptor(&strategy.time_format).is_none() {
                tracing::warn!(
                    "strategy {} uses unknown time format {:?}",
                    strategy.id, strategy.time_format
                );
            }
        }
        Ok(())
    }
}

impl WorkerConfig {
    /// Load worker configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            worker_num: env_parse("AGENT_WORKER_NUM").unwrap_or(defaults.worker_num),
            telemetry_interval_secs: env_parse("AGENT_TELEMETRY_INTERVAL")
                .unwrap_or(defaults.telemetry_interval_secs),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyConfig;
    use std::collections::BTreeMap;
    use std::io::Write;

    fn strategy(id: i64) -> StrategyConfig {
        StrategyConfig {
            id,
            name: format!("s{}", id),
            file_path: "/var/log/app.log".to_string(),
            time_format: "yyyy-mm-dd HH:MM:SS".to_string(),
            pattern: None,
            exclude: None,
            tags: BTreeMap::new(),
        }
    }

    // ── AgentConfig validation ──────────────────────────────────

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker.worker_num, 10);
        assert_eq!(config.worker.telemetry_interval_secs, 10);
        assert_eq!(config.input_file(), None);
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = AgentConfig::default();
        config.worker.worker_num = 0;
        assert!(config.validate().unwrap_err().contains("worker_num"));
    }

    #[test]
    fn test_validate_zero_intervals() {
        let mut config = AgentConfig::default();
        config.freshness.reset_check_interval_secs = 0;
        assert!(config.validate().unwrap_err().contains("reset_check_interval_secs"));

        let mut config = AgentConfig::default();
        config.sample_log.window_secs = 0;
        assert!(config.validate().unwrap_err().contains("window_secs"));

        let mut config = AgentConfig::default();
        config.sample_log.max_per_window = 0;
        assert!(config.validate().unwrap_err().contains("max_per_window"));
    }

    #[test]
    fn test_validate_duplicate_strategy_ids() {
        let config = AgentConfig {
            strategies: vec![strategy(1), strategy(1)],
            ..AgentConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_validate_empty_file_path() {
        let mut s = strategy(1);
        s.file_path.clear();
        let config = AgentConfig {
            strategies: vec![s],
            ..AgentConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("file_path"));
    }

    #[test]
    fn test_input_file_falls_back_to_first_strategy() {
        let mut config = AgentConfig {
            strategies: vec![strategy(1)],
            ..AgentConfig::default()
        };
        assert_eq!(config.input_file(), Some("/var/log/app.log"));

        config.input_file = Some("/var/log/other.log".to_string());
        assert_eq!(config.input_file(), Some("/var/log/other.log"));
    }

    // ── File loading ────────────────────────────────────────────

    #[test]
    fn test_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[worker]
worker_num = 4

[[strategies]]
id = 1
name = "latency"
file_path = "/var/log/nginx/access.log"
time_format = "dd/mmm/yyyy:HH:MM:SS"
pattern = 'rt=(\d+\.\d+)'
exclude = "healthcheck"

[strategies.tags]
upstream = 'upstream=(\S+)'
"#
        )
        .unwrap();

        let config = AgentConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.worker.worker_num, 4);
        assert_eq!(config.worker.telemetry_interval_secs, 10);
        assert_eq!(config.freshness.reset_check_interval_secs, 60);
        assert_eq!(config.strategies.len(), 1);
        assert_eq!(config.strategies[0].tags.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_missing() {
        let result = AgentConfig::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_from_file_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[worker\nworker_num = ").unwrap();
        let result = AgentConfig::from_file(file.path().to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
