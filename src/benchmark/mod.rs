//! Benchmark service boundary.
//!
//! The scoring service is an external collaborator: it owns scenarios,
//! applies submitted changesets and scores them. This module defines the
//! payloads it exchanges and the [`BenchmarkApi`] trait both the coordinator
//! and the responder consume, with a `reqwest` implementation in [`client`].

pub mod client;

pub use client::HttpBenchmarkClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::changeset::Changeset;
use crate::error::BenchmarkError;

/// `GET /scenarios` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioList {
    pub ids: Vec<String>,
}

/// `GET /scenarios/datamodel/{caseId}` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseData {
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub datamodel: Value,
}

/// `POST /scenarios/submit-changeset` body.
///
/// The changeset travels as a JSON string, not a nested object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitChangesetRequest {
    pub case_id: String,
    pub white_agent_id: String,
    pub changeset: String,
}

impl SubmitChangesetRequest {
    pub fn new(
        case_id: impl Into<String>,
        white_agent_id: impl Into<String>,
        changeset: &Changeset,
    ) -> Result<Self, BenchmarkError> {
        Ok(Self {
            case_id: case_id.into(),
            white_agent_id: white_agent_id.into(),
            changeset: changeset.to_json_string()?,
        })
    }
}

/// `POST /scenarios/submit-changeset` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitChangesetResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Aggregate scoring payload for one agent id.
///
/// Kept as raw JSON so unknown fields survive into the run report; the
/// accessors read the well-known ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationResult(pub Value);

impl EvaluationResult {
    /// Placeholder payload recorded when results could not be fetched.
    pub fn fetch_failed(reason: impl std::fmt::Display) -> Self {
        Self(serde_json::json!({ "error": format!("Failed to fetch results: {reason}") }))
    }

    /// Overall score in percent, when numeric.
    pub fn score(&self) -> Option<f64> {
        self.0.get("score").and_then(Value::as_f64)
    }

    pub fn total_passed(&self) -> Option<u64> {
        self.0.get("totalPassed").and_then(Value::as_u64)
    }

    pub fn total_failed(&self) -> Option<u64> {
        self.0.get("totalFailed").and_then(Value::as_u64)
    }

    pub fn error(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

/// Operations the benchmark service exposes.
///
/// Every call takes the service base URL, since a run request may point at a
/// different benchmark than the configured default.
#[async_trait]
pub trait BenchmarkApi: Send + Sync {
    /// Clears previously generated state.
    async fn restart(&self, base_url: &str) -> Result<(), BenchmarkError>;

    /// Lists every scenario id.
    async fn list_scenarios(&self, base_url: &str) -> Result<ScenarioList, BenchmarkError>;

    /// Fetches the prompt and document model for one case.
    async fn case_data(&self, base_url: &str, case_id: &str) -> Result<CaseData, BenchmarkError>;

    /// Submits a changeset. A non-2xx status is an error, never a silent no-op.
    async fn submit_changeset(
        &self,
        base_url: &str,
        request: &SubmitChangesetRequest,
    ) -> Result<SubmitChangesetResponse, BenchmarkError>;

    /// Fetches the aggregate score for an agent id.
    async fn results(&self, base_url: &str, white_agent_id: &str) -> Result<EvaluationResult, BenchmarkError>;
}
