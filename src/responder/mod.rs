//! Responding side of the benchmark exchange.
//!
//! For each case request: fetch the case, ask the LLM for a changeset,
//! sanitize it against the case's shapes and submit it. Every reply, success
//! or failure, goes back inside the `<json>` envelope.

pub mod config;
pub mod prompts;

pub use config::ResponderConfig;
pub use prompts::{changeset_user_message, CHANGESET_SYSTEM_PROMPT};

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::benchmark::{BenchmarkApi, SubmitChangesetRequest};
use crate::changeset::{sanitize, Changeset, ChangesetSummary};
use crate::error::CaseError;
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::protocol::{CaseRequest, ReplyAction, TaggedFields, CASE_OK_PREFIX, TAG_BATTLE_ID};
use crate::reporting::{EventReporter, RunEvent};
use crate::schema::ShapeIndex;
use crate::utils::extract_json_object;

/// Result of one successfully handled case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseSubmission {
    pub case_id: String,
    pub changeset: Changeset,
    pub summary: ChangesetSummary,
}

impl CaseSubmission {
    /// Reply content returned to the requester.
    pub fn status(&self) -> String {
        format!("{CASE_OK_PREFIX} {} (submitted)", self.case_id)
    }
}

/// Handles case requests end to end.
pub struct CaseResponder {
    config: ResponderConfig,
    benchmark: Arc<dyn BenchmarkApi>,
    llm: Arc<dyn LlmProvider>,
    reporter: Arc<dyn EventReporter>,
}

impl CaseResponder {
    pub fn new(
        config: ResponderConfig,
        benchmark: Arc<dyn BenchmarkApi>,
        llm: Arc<dyn LlmProvider>,
        reporter: Arc<dyn EventReporter>,
    ) -> Self {
        Self {
            config,
            benchmark,
            llm,
            reporter,
        }
    }

    /// Handles one request message and returns the enveloped reply.
    pub async fn handle(&self, text: &str) -> String {
        let tags = TaggedFields::parse(text);
        let battle_id = tags
            .get(TAG_BATTLE_ID)
            .map(str::to_string)
            .or_else(|| self.config.battle_id.clone());

        let reply = match self.process(&tags, battle_id.as_deref()).await {
            Ok(submission) => submission.status(),
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Case failed");
                self.emit(battle_id.as_deref(), self.event(&message)).await;
                message
            }
        };
        ReplyAction::respond(reply).to_envelope()
    }

    /// Fetches, generates, sanitizes and submits one case.
    pub async fn process(&self, tags: &TaggedFields, battle_id: Option<&str>) -> Result<CaseSubmission, CaseError> {
        let mut request = CaseRequest::from_tags(tags).ok_or(CaseError::MissingCaseId)?;
        if request.benchmark_api_url.is_empty() {
            request.benchmark_api_url = self.config.benchmark_api_url.clone();
        }
        if request.white_agent_id.is_empty() {
            request.white_agent_id = self.config.white_agent_id.clone();
        }
        let case_id = request.case_id.as_str();

        info!(case_id, benchmark_api_url = %request.benchmark_api_url, "Received case");
        self.emit(
            battle_id,
            self.event("Received case").with_detail(json!({
                "case_id": case_id,
                "benchmark_api_url": request.benchmark_api_url,
            })),
        )
        .await;
        let case = self
            .benchmark
            .case_data(&request.benchmark_api_url, case_id)
            .await
            .map_err(CaseError::FetchCase)?;
        let index = ShapeIndex::from_datamodel(&case.datamodel);
        info!(case_id, prompt_len = case.prompt.len(), shapes = index.len(), "Fetched case");

        let raw = self.generate(case_id, &case.prompt, &case.datamodel).await?;
        let changeset = sanitize(&raw, &index);
        let summary = ChangesetSummary::from_changeset(&changeset);
        info!(
            case_id,
            added = summary.added,
            modified = summary.modified,
            deleted = summary.deleted,
            approx_fields_changed = summary.approx_fields_changed,
            modified_ids = ?summary.modified_ids,
            deleted_ids = ?summary.deleted_ids,
            "Changeset summary"
        );

        let submit_error = |source| CaseError::Submit {
            case_id: case_id.to_string(),
            source,
        };
        let body = SubmitChangesetRequest::new(case_id, &request.white_agent_id, &changeset).map_err(submit_error)?;
        self.benchmark
            .submit_changeset(&request.benchmark_api_url, &body)
            .await
            .map_err(submit_error)?;
        info!(case_id, "Changeset submitted");

        self.emit(
            battle_id,
            self.event("Submitted case").with_detail(json!({
                "case_id": case_id,
                "status": "submitted",
                "summary": summary,
            })),
        )
        .await;

        Ok(CaseSubmission {
            case_id: request.case_id.clone(),
            changeset,
            summary,
        })
    }

    /// Asks the model for a changeset and extracts the JSON object it returns.
    async fn generate(
        &self,
        case_id: &str,
        instruction: &str,
        datamodel: &serde_json::Value,
    ) -> Result<serde_json::Value, CaseError> {
        let model = self.config.model.clone();
        let generation_error = |reason: String| CaseError::Generation {
            model: model.clone(),
            reason,
        };

        info!(case_id, model = %model, "Generating changeset");
        let request = GenerationRequest::new(
            model.clone(),
            vec![
                Message::system(CHANGESET_SYSTEM_PROMPT),
                Message::user(changeset_user_message(case_id, instruction, &datamodel.to_string())),
            ],
        )
        .with_temperature(self.config.temperature);

        let response = self
            .llm
            .generate(request)
            .await
            .map_err(|e| generation_error(e.to_string()))?;
        let content = response
            .first_content()
            .ok_or_else(|| generation_error("response contained no choices".to_string()))?;
        let object = extract_json_object(content).map_err(|e| generation_error(e.to_string()))?;
        Ok(serde_json::Value::Object(object))
    }

    async fn emit(&self, battle_id: Option<&str>, event: RunEvent) {
        self.reporter.report(battle_id, event).await;
    }

    fn event(&self, message: impl Into<String>) -> RunEvent {
        RunEvent::new(&self.config.reporter_name, message)
    }
}
