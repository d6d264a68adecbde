//! YAML configuration loading shared by the coordinator and responder configs.

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Reads and deserializes a YAML file. Missing keys fall back to the target's
/// `#[serde(default)]` values.
pub fn load_yaml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse { path: display, source })
}

/// Parses a requested case count: values below 1 clamp to 1, anything that
/// does not parse as an integer falls back to `fallback`.
pub fn parse_num_cases(raw: &str, fallback: usize) -> usize {
    match raw.trim().parse::<i64>() {
        Ok(n) => usize::try_from(n.max(1)).unwrap_or(fallback),
        Err(_) => fallback,
    }
}
