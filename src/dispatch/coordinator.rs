//! Sequencing of one evaluation run.
//!
//! reset → list → select → dispatch each case in order → fetch results → report.
//! Reset and listing failures abort the run. Anything that goes wrong with a
//! single case is recorded against it and the run moves on.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::config::{RunConfig, RunParams};
use super::run::{truncate_chars, CaseOutcome, EvaluationRun};
use crate::benchmark::{BenchmarkApi, EvaluationResult};
use crate::error::{BenchmarkError, RunError};
use crate::exchange::Counterparty;
use crate::protocol::{reply_text, CaseRequest, RunRequest};
use crate::reporting::{EventReporter, RunEvent};
use crate::selection::{CaseSelector, DifficultyCounts};

/// Reply text attached to per-case events.
const EVENT_REPLY_PREVIEW_CHARS: usize = 400;

/// Drives evaluation runs against a counterparty.
///
/// Holds no per-run state, so independent runs may share one coordinator.
pub struct DispatchCoordinator {
    config: RunConfig,
    benchmark: Arc<dyn BenchmarkApi>,
    counterparty: Arc<dyn Counterparty>,
    reporter: Arc<dyn EventReporter>,
}

impl DispatchCoordinator {
    pub fn new(
        config: RunConfig,
        benchmark: Arc<dyn BenchmarkApi>,
        counterparty: Arc<dyn Counterparty>,
        reporter: Arc<dyn EventReporter>,
    ) -> Self {
        Self {
            config,
            benchmark,
            counterparty,
            reporter,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Handles a run request message and returns the status text for the caller.
    ///
    /// Fatal errors come back as their message; they never panic or propagate.
    pub async fn handle_request(&self, text: &str) -> String {
        match self.execute(&RunRequest::from_text(text)).await {
            Ok(run) => run.status_line(),
            Err(e) => e.to_string(),
        }
    }

    /// Resolves a request against the configuration and runs it.
    ///
    /// A fatal error is reported as a single event before it is returned.
    pub async fn execute(&self, request: &RunRequest) -> Result<EvaluationRun, RunError> {
        let result = match self.config.resolve(request) {
            Ok(params) => self.run(&params).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            let battle_id = request.battle_id.as_deref().or(self.config.battle_id.as_deref());
            warn!(error = %e, "Evaluation run aborted");
            self.emit(battle_id, self.event(e.to_string())).await;
        }
        result
    }

    async fn emit(&self, battle_id: Option<&str>, event: RunEvent) {
        self.reporter.report(battle_id, event).await;
    }

    fn event(&self, message: impl Into<String>) -> RunEvent {
        RunEvent::new(&self.config.reporter_name, message)
    }

    /// Executes one run with already-resolved parameters.
    pub async fn run(&self, params: &RunParams) -> Result<EvaluationRun, RunError> {
        let battle_id = params.battle_id.as_deref();
        let mut run = EvaluationRun::new(params.battle_id.clone(), &params.white_agent_id, params.num_cases);

        info!(
            benchmark_api_url = %params.benchmark_api_url,
            white_agent_url = %params.white_agent_url,
            white_agent_id = %params.white_agent_id,
            num_cases = params.num_cases,
            "Starting evaluation"
        );
        self.emit(
            battle_id,
            self.event("Starting evaluation").with_detail(json!({
                "benchmark_api_url": params.benchmark_api_url,
                "white_agent_url": params.white_agent_url,
                "white_agent_id": params.white_agent_id,
                "num_cases": params.num_cases,
            })),
        )
        .await;

        self.benchmark
            .restart(&params.benchmark_api_url)
            .await
            .map_err(RunError::Reset)?;
        info!("Benchmark reset complete");
        self.emit(battle_id, self.event("Restarted benchmark (cleared generated files)"))
            .await;

        let scenarios = self
            .benchmark
            .list_scenarios(&params.benchmark_api_url)
            .await
            .map_err(RunError::Listing)?;
        if scenarios.ids.is_empty() {
            return Err(RunError::Listing(BenchmarkError::NoScenarios));
        }
        info!(count = scenarios.ids.len(), "Fetched scenario ids");

        let mut selector = CaseSelector::new();
        if let Some(seed) = self.config.seed {
            selector = selector.with_seed(seed);
        }
        run.selected_cases = selector.select(&scenarios.ids, params.num_cases);
        let counts = DifficultyCounts::tally(&run.selected_cases);
        info!(selected = run.selected_cases.len(), ?counts, "Selected cases");
        self.emit(
            battle_id,
            self.event("Selected cases").with_detail(json!({
                "selected": run.selected_cases,
                "difficulty_counts": counts,
            })),
        )
        .await;

        let total = run.selected_cases.len();
        for (idx, case_id) in run.selected_cases.clone().iter().enumerate() {
            let outcome = self.dispatch_case(params, &mut run, case_id, idx + 1, total).await;
            run.record(case_id.clone(), outcome);
        }

        let evaluation = match self
            .benchmark
            .results(&params.benchmark_api_url, &params.white_agent_id)
            .await
        {
            Ok(evaluation) => {
                match evaluation.score() {
                    Some(score) => info!(
                        white_agent_id = %params.white_agent_id,
                        score = format!("{score:.1}%"),
                        assertions_passed = ?evaluation.total_passed(),
                        assertions_failed = ?evaluation.total_failed(),
                        "Evaluation fetched"
                    ),
                    None => info!(white_agent_id = %params.white_agent_id, "Evaluation fetched"),
                }
                evaluation
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch results");
                EvaluationResult::fetch_failed(e)
            }
        };
        run.final_result = Some(evaluation);

        self.emit(
            battle_id,
            self.event("Evaluation complete")
                .with_markdown(run.markdown())
                .with_detail(json!({ "selected_cases": run.selected_cases }))
                .as_result(),
        )
        .await;

        Ok(run)
    }

    /// One exchange. Captures the conversation id from the first reply carrying one.
    async fn dispatch_case(
        &self,
        params: &RunParams,
        run: &mut EvaluationRun,
        case_id: &str,
        position: usize,
        total: usize,
    ) -> CaseOutcome {
        let battle_id = params.battle_id.as_deref();
        let request = CaseRequest {
            benchmark_api_url: params.benchmark_api_url.clone(),
            case_id: case_id.to_string(),
            white_agent_id: params.white_agent_id.clone(),
            battle_id: params.battle_id.clone(),
        };

        info!(case_id, position, total, endpoint = %params.white_agent_url, "Sending case");
        self.emit(
            battle_id,
            self.event(format!("Sending case {position}/{total}"))
                .with_detail(json!({ "case_id": case_id })),
        )
        .await;

        match self
            .counterparty
            .send(
                &params.white_agent_url,
                &request.render(),
                run.conversation_context.as_deref(),
            )
            .await
        {
            Ok(reply) => {
                if run.conversation_context.is_none() {
                    run.conversation_context = reply.context_id;
                }
                let text = reply_text(&reply.text);
                let outcome = CaseOutcome::from_reply(&text);
                let message = if outcome.is_error() {
                    warn!(case_id, reply = %truncate_chars(&text, 120), "Counterparty reported failure");
                    format!("Counterparty reported failure for {case_id}")
                } else {
                    info!(case_id, reply_preview = %truncate_chars(&text, 120), "Counterparty replied");
                    format!("Counterparty replied for {case_id}")
                };
                self.emit(
                    battle_id,
                    self.event(message)
                        .with_detail(json!({ "reply_preview": truncate_chars(&text, EVENT_REPLY_PREVIEW_CHARS) })),
                )
                .await;
                outcome
            }
            Err(e) => {
                warn!(case_id, error = %e, "Counterparty failed");
                self.emit(
                    battle_id,
                    self.event(format!("Counterparty failed for {case_id}"))
                        .with_detail(json!({ "error": e.to_string() })),
                )
                .await;
                CaseOutcome::Error(e.to_string())
            }
        }
    }
}
