//! `reqwest` implementation of [`BenchmarkApi`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{BenchmarkApi, CaseData, EvaluationResult, ScenarioList, SubmitChangesetRequest, SubmitChangesetResponse};
use crate::error::{BenchmarkError, ConfigError};

/// Default timeout for restart, listing, datamodel and results calls.
pub const DEFAULT_BENCHMARK_TIMEOUT: Duration = Duration::from_secs(60);
/// Default timeout for changeset submission, which applies and scores the edit.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(120);

const RESTART_PATH: &str = "/scenarios/restart";
const SCENARIOS_PATH: &str = "/scenarios";
const DATAMODEL_PATH: &str = "/scenarios/datamodel";
const SUBMIT_PATH: &str = "/scenarios/submit-changeset";
const RESULTS_PATH: &str = "/scenarios/results";

/// HTTP client for the benchmark service.
pub struct HttpBenchmarkClient {
    http_client: Client,
    submit_timeout: Duration,
}

impl HttpBenchmarkClient {
    /// Create a client with explicit request and submission timeouts.
    pub fn with_timeouts(timeout: Duration, submit_timeout: Duration) -> Result<Self, ConfigError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http_client,
            submit_timeout,
        })
    }

    /// Sends a request and fails on transport errors or a non-2xx status.
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response, BenchmarkError> {
        let response = request.send().await.map_err(|e| BenchmarkError::RequestFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BenchmarkError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> Result<T, BenchmarkError> {
        self.send(endpoint, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BenchmarkError::MalformedResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
    }
}

fn join(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn join_segment(base_url: &str, path: &str, segment: &str) -> String {
    format!("{}/{}", join(base_url, path), urlencoding::encode(segment))
}

#[async_trait]
impl BenchmarkApi for HttpBenchmarkClient {
    async fn restart(&self, base_url: &str) -> Result<(), BenchmarkError> {
        let url = join(base_url, RESTART_PATH);
        debug!(url = %url, "Restarting benchmark");
        // The response body carries nothing the run needs.
        self.send(RESTART_PATH, self.http_client.post(&url)).await.map(|_| ())
    }

    async fn list_scenarios(&self, base_url: &str) -> Result<ScenarioList, BenchmarkError> {
        let url = join(base_url, SCENARIOS_PATH);
        let list: ScenarioList = self.send_json(SCENARIOS_PATH, self.http_client.get(&url)).await?;
        if list.ids.is_empty() {
            return Err(BenchmarkError::NoScenarios);
        }
        debug!(count = list.ids.len(), "Listed scenarios");
        Ok(list)
    }

    async fn case_data(&self, base_url: &str, case_id: &str) -> Result<CaseData, BenchmarkError> {
        let url = join_segment(base_url, DATAMODEL_PATH, case_id);
        self.send_json(DATAMODEL_PATH, self.http_client.get(&url)).await
    }

    async fn submit_changeset(
        &self,
        base_url: &str,
        request: &SubmitChangesetRequest,
    ) -> Result<SubmitChangesetResponse, BenchmarkError> {
        let url = join(base_url, SUBMIT_PATH);
        let builder = self
            .http_client
            .post(&url)
            .timeout(self.submit_timeout)
            .json(request);
        let response = self.send(SUBMIT_PATH, builder).await?;
        // Status decides success; the body is informational only.
        Ok(response.json().await.unwrap_or_default())
    }

    async fn results(&self, base_url: &str, white_agent_id: &str) -> Result<EvaluationResult, BenchmarkError> {
        let url = join_segment(base_url, RESULTS_PATH, white_agent_id);
        self.send_json(RESULTS_PATH, self.http_client.get(&url)).await
    }
}
