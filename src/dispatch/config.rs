//! Configuration for evaluation runs.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::benchmark::client::{DEFAULT_BENCHMARK_TIMEOUT, DEFAULT_SUBMIT_TIMEOUT};
use crate::config::{load_yaml_file, parse_num_cases};
use crate::error::{ConfigError, RunError};
use crate::exchange::DEFAULT_EXCHANGE_TIMEOUT;
use crate::protocol::RunRequest;
use crate::reporting::DEFAULT_REPORT_TIMEOUT;
use crate::selection::MIXED_RUN_SIZE;

pub const DEFAULT_BENCHMARK_API_URL: &str = "http://localhost:5050";
pub const DEFAULT_WHITE_AGENT_ID: &str = "agentbeats-white";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:9000";
pub const DEFAULT_COORDINATOR_NAME: &str = "ppt_green_agent";

/// Coordinator configuration. Request tags override these per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Benchmark service base URL.
    pub benchmark_api_url: String,
    /// Counterparty endpoint, used when a request carries none.
    pub white_agent_url: Option<String>,
    /// Agent id submissions and results are keyed by.
    pub white_agent_id: String,
    /// Target number of cases.
    pub num_cases: usize,
    /// Battle id used when a request carries none.
    pub battle_id: Option<String>,
    /// Event reporting backend.
    pub backend_url: String,
    /// `reported_by` value on emitted events.
    pub reporter_name: String,
    /// Fixed selection seed for reproducible runs.
    pub seed: Option<u64>,
    pub benchmark_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    pub exchange_timeout_secs: u64,
    pub report_timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            benchmark_api_url: DEFAULT_BENCHMARK_API_URL.to_string(),
            white_agent_url: None,
            white_agent_id: DEFAULT_WHITE_AGENT_ID.to_string(),
            num_cases: MIXED_RUN_SIZE,
            battle_id: None,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            reporter_name: DEFAULT_COORDINATOR_NAME.to_string(),
            seed: None,
            benchmark_timeout_secs: DEFAULT_BENCHMARK_TIMEOUT.as_secs(),
            submit_timeout_secs: DEFAULT_SUBMIT_TIMEOUT.as_secs(),
            exchange_timeout_secs: DEFAULT_EXCHANGE_TIMEOUT.as_secs(),
            report_timeout_secs: DEFAULT_REPORT_TIMEOUT.as_secs(),
        }
    }
}

impl RunConfig {
    /// Loads a configuration file; absent keys keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_yaml_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no run could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.benchmark_api_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "benchmark_api_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.white_agent_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "white_agent_id".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.num_cases == 0 {
            return Err(ConfigError::InvalidValue {
                key: "num_cases".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_benchmark_api_url(mut self, url: impl Into<String>) -> Self {
        self.benchmark_api_url = url.into();
        self
    }

    pub fn with_white_agent_url(mut self, url: impl Into<String>) -> Self {
        self.white_agent_url = Some(url.into());
        self
    }

    pub fn with_white_agent_id(mut self, id: impl Into<String>) -> Self {
        self.white_agent_id = id.into();
        self
    }

    /// Sets the target case count, clamped to at least 1.
    pub fn with_num_cases(mut self, num_cases: usize) -> Self {
        self.num_cases = num_cases.max(1);
        self
    }

    pub fn with_battle_id(mut self, battle_id: impl Into<String>) -> Self {
        self.battle_id = Some(battle_id.into());
        self
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    pub fn with_reporter_name(mut self, name: impl Into<String>) -> Self {
        self.reporter_name = name.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn benchmark_timeout(&self) -> Duration {
        Duration::from_secs(self.benchmark_timeout_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }

    /// Merges a run request over this configuration.
    ///
    /// Request tags win over configured values. A counterparty URL is required
    /// from one or the other.
    pub fn resolve(&self, request: &RunRequest) -> Result<RunParams, RunError> {
        let white_agent_url = request
            .white_agent_url
            .clone()
            .or_else(|| self.white_agent_url.clone())
            .ok_or(RunError::MissingCounterparty)?;

        let num_cases = match &request.num_cases {
            Some(raw) => parse_num_cases(raw, MIXED_RUN_SIZE),
            None => self.num_cases.max(1),
        };

        Ok(RunParams {
            white_agent_url,
            benchmark_api_url: request
                .benchmark_api_url
                .clone()
                .unwrap_or_else(|| self.benchmark_api_url.clone()),
            white_agent_id: request
                .white_agent_id
                .clone()
                .unwrap_or_else(|| self.white_agent_id.clone()),
            num_cases,
            battle_id: request.battle_id.clone().or_else(|| self.battle_id.clone()),
        })
    }
}

/// Effective parameters of one run after merging request tags over config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunParams {
    pub white_agent_url: String,
    pub benchmark_api_url: String,
    pub white_agent_id: String,
    pub num_cases: usize,
    pub battle_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.benchmark_api_url, "http://localhost:5050");
        assert_eq!(config.white_agent_id, "agentbeats-white");
        assert_eq!(config.num_cases, 10);
        assert_eq!(config.exchange_timeout(), Duration::from_secs(600));
        assert_eq!(config.exchange_timeout(), DEFAULT_EXCHANGE_TIMEOUT);
        assert_eq!(config.benchmark_timeout(), Duration::from_secs(60));
        assert_eq!(config.submit_timeout(), Duration::from_secs(120));
        assert_eq!(config.report_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_requires_counterparty() {
        let err = RunConfig::default().resolve(&RunRequest::default()).unwrap_err();
        assert!(matches!(err, RunError::MissingCounterparty));
    }

    #[test]
    fn test_tags_override_config() {
        let config = RunConfig::default()
            .with_white_agent_url("http://configured/")
            .with_battle_id("configured-battle")
            .with_num_cases(3);
        let request = RunRequest {
            white_agent_url: Some("http://tagged/".to_string()),
            white_agent_id: Some("tagged-agent".to_string()),
            num_cases: Some("0".to_string()),
            ..Default::default()
        };
        let params = config.resolve(&request).unwrap();
        assert_eq!(params.white_agent_url, "http://tagged/");
        assert_eq!(params.white_agent_id, "tagged-agent");
        assert_eq!(params.benchmark_api_url, "http://localhost:5050");
        assert_eq!(params.num_cases, 1);
        assert_eq!(params.battle_id.as_deref(), Some("configured-battle"));
    }

    #[test]
    fn test_unparsable_num_cases_tag_falls_back_to_ten() {
        let config = RunConfig::default().with_white_agent_url("http://w").with_num_cases(4);
        let request = RunRequest {
            num_cases: Some("many".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve(&request).unwrap().num_cases, 10);
        assert_eq!(config.resolve(&RunRequest::default()).unwrap().num_cases, 4);
    }

    #[test]
    fn test_from_yaml_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "white_agent_url: http://localhost:9002/\nnum_cases: 5\nseed: 7").unwrap();
        let config = RunConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.white_agent_url.as_deref(), Some("http://localhost:9002/"));
        assert_eq!(config.num_cases, 5);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.backend_url, "http://localhost:9000");
    }

    #[test]
    fn test_from_yaml_file_rejects_zero_cases() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "num_cases: 0").unwrap();
        let err = RunConfig::from_yaml_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
