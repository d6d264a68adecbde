//! Configuration for the case responder.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::benchmark::client::{DEFAULT_BENCHMARK_TIMEOUT, DEFAULT_SUBMIT_TIMEOUT};
use crate::config::load_yaml_file;
use crate::dispatch::config::{DEFAULT_BACKEND_URL, DEFAULT_BENCHMARK_API_URL, DEFAULT_WHITE_AGENT_ID};
use crate::error::ConfigError;
use crate::llm::DEFAULT_LLM_TIMEOUT;
use crate::reporting::DEFAULT_REPORT_TIMEOUT;

pub const DEFAULT_MODEL: &str = "openai/gpt-5.2";
pub const DEFAULT_LLM_API_BASE: &str = "http://localhost:4000";
pub const DEFAULT_RESPONDER_NAME: &str = "ppt_white_agent";

/// Responder configuration. Request tags override the URLs and ids per case.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    pub model: String,
    pub api_base: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f64,
    pub benchmark_api_url: String,
    pub white_agent_id: String,
    pub battle_id: Option<String>,
    pub backend_url: String,
    pub reporter_name: String,
    pub llm_timeout_secs: u64,
    pub benchmark_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    pub report_timeout_secs: u64,
}

impl std::fmt::Debug for ResponderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponderConfig")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("benchmark_api_url", &self.benchmark_api_url)
            .field("white_agent_id", &self.white_agent_id)
            .field("battle_id", &self.battle_id)
            .field("backend_url", &self.backend_url)
            .field("reporter_name", &self.reporter_name)
            .finish_non_exhaustive()
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_LLM_API_BASE.to_string(),
            api_key: None,
            temperature: 0.0,
            benchmark_api_url: DEFAULT_BENCHMARK_API_URL.to_string(),
            white_agent_id: DEFAULT_WHITE_AGENT_ID.to_string(),
            battle_id: None,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            reporter_name: DEFAULT_RESPONDER_NAME.to_string(),
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT.as_secs(),
            benchmark_timeout_secs: DEFAULT_BENCHMARK_TIMEOUT.as_secs(),
            submit_timeout_secs: DEFAULT_SUBMIT_TIMEOUT.as_secs(),
            report_timeout_secs: DEFAULT_REPORT_TIMEOUT.as_secs(),
        }
    }
}

impl ResponderConfig {
    /// Loads a configuration file; absent keys keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_yaml_file(path)?;
        if !(0.0..=2.0).contains(&config.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "temperature".to_string(),
                message: format!("{} is outside 0.0..=2.0", config.temperature),
            });
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_benchmark_api_url(mut self, url: impl Into<String>) -> Self {
        self.benchmark_api_url = url.into();
        self
    }

    pub fn with_white_agent_id(mut self, id: impl Into<String>) -> Self {
        self.white_agent_id = id.into();
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

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn benchmark_timeout(&self) -> Duration {
        Duration::from_secs(self.benchmark_timeout_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }
}
