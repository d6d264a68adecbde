//! End-to-end run through the public API with in-process collaborators.
//!
//! The coordinator's counterparty is a `CaseResponder` wired to the same
//! in-memory benchmark, so every case goes through tag rendering, LLM output
//! extraction, sanitation, submission and scoring.

use async_trait::async_trait;
use deckbench::benchmark::{
    BenchmarkApi, CaseData, EvaluationResult, ScenarioList, SubmitChangesetRequest, SubmitChangesetResponse,
};
use deckbench::dispatch::{CaseOutcome, DispatchCoordinator, RunConfig};
use deckbench::error::{BenchmarkError, ExchangeError, LlmError};
use deckbench::exchange::{Counterparty, CounterpartyReply};
use deckbench::llm::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};
use deckbench::protocol::RunRequest;
use deckbench::reporting::RecordingReporter;
use deckbench::responder::{CaseResponder, ResponderConfig};
use deckbench::selection::DifficultyCounts;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Benchmark that scores a case as passed when its changeset is non-empty.
struct InMemoryBenchmark {
    ids: Vec<String>,
    /// Assertion count results are scored against.
    total_tests: usize,
    /// Case ids whose submission is rejected with a 422.
    reject: Vec<String>,
    submissions: Mutex<HashMap<String, Vec<(String, Value)>>>,
    restarts: AtomicUsize,
}

impl InMemoryBenchmark {
    fn new(ids: Vec<String>, reject: &[&str], total_tests: usize) -> Self {
        Self {
            ids,
            total_tests,
            reject: reject.iter().map(|s| s.to_string()).collect(),
            submissions: Mutex::new(HashMap::new()),
            restarts: AtomicUsize::new(0),
        }
    }

    fn submitted_cases(&self, agent: &str) -> Vec<String> {
        self.submissions
            .lock()
            .unwrap()
            .get(agent)
            .map(|subs| subs.iter().map(|(case, _)| case.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BenchmarkApi for InMemoryBenchmark {
    async fn restart(&self, _base_url: &str) -> Result<(), BenchmarkError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        self.submissions.lock().unwrap().clear();
        Ok(())
    }

    async fn list_scenarios(&self, _base_url: &str) -> Result<ScenarioList, BenchmarkError> {
        Ok(ScenarioList { ids: self.ids.clone() })
    }

    async fn case_data(&self, _base_url: &str, case_id: &str) -> Result<CaseData, BenchmarkError> {
        Ok(CaseData {
            case_id: Some(case_id.to_string()),
            prompt: format!("Tidy up slide for {case_id}."),
            datamodel: json!({"slides": [{"shapes": [
                {"id": 10, "shapeType": "textbox"},
                {"id": 11, "shapeType": "placeholder"},
                {"id": 12, "shapeType": "icon"},
                {"id": 13, "shapeType": "autoShape", "details": {"preset": "rect"}}
            ]}]}),
        })
    }

    async fn submit_changeset(
        &self,
        _base_url: &str,
        request: &SubmitChangesetRequest,
    ) -> Result<SubmitChangesetResponse, BenchmarkError> {
        if self.reject.contains(&request.case_id) {
            return Err(BenchmarkError::Status {
                endpoint: "/scenarios/submit-changeset".to_string(),
                status: 422,
                body: "changeset did not apply".to_string(),
            });
        }
        let changeset: Value = serde_json::from_str(&request.changeset)?;
        self.submissions
            .lock()
            .unwrap()
            .entry(request.white_agent_id.clone())
            .or_default()
            .push((request.case_id.clone(), changeset));
        Ok(SubmitChangesetResponse {
            success: true,
            ..Default::default()
        })
    }

    async fn results(&self, _base_url: &str, white_agent_id: &str) -> Result<EvaluationResult, BenchmarkError> {
        let submissions = self.submissions.lock().unwrap();
        let subs = submissions.get(white_agent_id).cloned().unwrap_or_default();
        let passed = subs
            .iter()
            .filter(|(_, cs)| cs["modified"].as_array().is_some_and(|m| !m.is_empty()))
            .count();
        let total = self.total_tests.max(subs.len());
        Ok(EvaluationResult(json!({
            "whiteAgentId": white_agent_id,
            "score": passed as f64 * 100.0 / total as f64,
            "totalTests": total,
            "totalPassed": passed,
            "totalFailed": total - passed,
        })))
    }
}

/// LLM that answers every case with the same sloppy changeset.
struct ScriptedLlm;

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let content = r#"Here is the changeset:
```json
{
  "added": [{"shapeType": "Picture", "pos": {"topLeft": [0, 0]}, "size": {"width": 10, "height": 5}}],
  "modified": [
    {"id": "10", "shapeType": "text box", "size": {"width": 200}},
    {"id": 11, "shapeType": "textbox", "xml": "<p>Title</p>", "zIndex": 3},
    {"id": 12, "shapeType": "icon", "pos": {"topLeft": [1, 1]}},
    {"id": 13, "shapeType": "autoShape", "pos": {"topLeft": [2, 2]}}
  ],
  "deleted": [{"id": 404}]
}
```"#;
        Ok(GenerationResponse {
            id: "scripted".to_string(),
            model: "scripted".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(content),
                finish_reason: "stop".to_string(),
            }],
            usage: Usage::default(),
        })
    }
}

/// Counterparty that hands requests to a local responder, failing chosen calls.
struct LocalCounterparty {
    responder: CaseResponder,
    fail_at: Vec<usize>,
    calls: AtomicUsize,
    contexts: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl Counterparty for LocalCounterparty {
    async fn send(
        &self,
        _endpoint: &str,
        text: &str,
        context_id: Option<&str>,
    ) -> Result<CounterpartyReply, ExchangeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.contexts.lock().unwrap().push(context_id.map(str::to_string));
        if self.fail_at.contains(&call) {
            return Err(ExchangeError::Transport("connection reset by peer".to_string()));
        }
        Ok(CounterpartyReply {
            text: self.responder.handle(text).await,
            context_id: Some("conversation-1".to_string()),
        })
    }
}

fn scenario_ids() -> Vec<String> {
    let mut ids = Vec::new();
    for i in 0..12 {
        ids.push(format!("pptc-{i}-simple"));
    }
    for i in 0..4 {
        ids.push(format!("pptc-{i}-medium"));
    }
    for i in 0..3 {
        ids.push(format!("pptc-{i}-complex"));
    }
    ids
}

struct Harness {
    benchmark: Arc<InMemoryBenchmark>,
    counterparty: Arc<LocalCounterparty>,
    reporter: Arc<RecordingReporter>,
    coordinator: DispatchCoordinator,
}

fn harness(reject: &[&str], fail_at: Vec<usize>, total_tests: usize) -> Harness {
    let benchmark = Arc::new(InMemoryBenchmark::new(scenario_ids(), reject, total_tests));
    let reporter = Arc::new(RecordingReporter::new());
    let responder = CaseResponder::new(
        ResponderConfig::default(),
        benchmark.clone(),
        Arc::new(ScriptedLlm),
        reporter.clone(),
    );
    let counterparty = Arc::new(LocalCounterparty {
        responder,
        fail_at,
        calls: AtomicUsize::new(0),
        contexts: Mutex::new(Vec::new()),
    });
    let coordinator = DispatchCoordinator::new(
        RunConfig::default().with_white_agent_url("http://white.local/").with_seed(42),
        benchmark.clone(),
        counterparty.clone(),
        reporter.clone(),
    );
    Harness {
        benchmark,
        counterparty,
        reporter,
        coordinator,
    }
}

#[tokio::test]
async fn test_full_run_with_default_mix() {
    let h = harness(&[], vec![], 10);
    let run = h.coordinator.execute(&RunRequest::default()).await.unwrap();

    assert_eq!(run.selected_cases.len(), 10);
    let counts = DifficultyCounts::tally(&run.selected_cases);
    assert_eq!((counts.simple, counts.medium, counts.hard), (7, 2, 1));

    assert_eq!(h.benchmark.restarts.load(Ordering::SeqCst), 1);
    assert_eq!(h.benchmark.submitted_cases("agentbeats-white"), run.selected_cases);
    assert!(run
        .outcomes
        .iter()
        .all(|r| r.outcome == CaseOutcome::Reply(format!("ok: {} (submitted)", r.case_id))));
    assert_eq!(run.score(), Some(100.0));
    assert_eq!(
        run.status_line(),
        "PowerPoint benchmark score (assertions) for `agentbeats-white`: 100.0%"
    );

    let contexts = h.counterparty.contexts.lock().unwrap().clone();
    assert_eq!(contexts[0], None);
    assert!(contexts[1..].iter().all(|c| c.as_deref() == Some("conversation-1")));
}

#[tokio::test]
async fn test_submitted_changesets_are_sanitized() {
    let h = harness(&[], vec![], 10);
    let request = RunRequest {
        num_cases: Some("1".to_string()),
        ..Default::default()
    };
    h.coordinator.execute(&request).await.unwrap();

    let submissions = h.benchmark.submissions.lock().unwrap();
    let (_, changeset) = &submissions["agentbeats-white"][0];

    let added = changeset["added"].as_array().unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0]["shapeType"], "image");
    assert_eq!(added[0]["size"], json!({"w": 10, "h": 5}));

    let modified = changeset["modified"].as_array().unwrap();
    let ids: Vec<i64> = modified.iter().map(|m| m["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![10, 11, 13]);
    assert_eq!(modified[0]["size"], json!({"w": 200}));
    assert_eq!(
        modified[1],
        json!({
            "id": 11,
            "shapeType": "placeholder",
            "shape": {"id": 11, "shapeType": "textbox", "xml": "<p>Title</p>"},
            "zIndex": 3
        })
    );
    assert_eq!(modified[2]["details"], json!({"preset": "rect"}));
    assert_eq!(changeset["deleted"], json!([]));
}

#[tokio::test]
async fn test_transport_failure_and_rejection_are_per_case() {
    let h = harness(&[], vec![3], 10);
    let request = RunRequest {
        num_cases: Some("5".to_string()),
        battle_id: Some("battle-42".to_string()),
        ..Default::default()
    };
    let run = h.coordinator.execute(&request).await.unwrap();

    assert_eq!(run.outcomes.len(), 5);
    assert!(run.outcomes[2].outcome.is_error());
    assert_eq!(run.failed_cases(), 1);
    assert_eq!(h.benchmark.submitted_cases("agentbeats-white").len(), 4);
    assert_eq!(run.score(), Some(40.0));

    let (battle, last) = h.reporter.events().pop().unwrap();
    assert_eq!(battle.as_deref(), Some("battle-42"));
    assert!(last.is_result);
    assert!(last.markdown_content.unwrap().contains("ERR Request to counterparty failed"));
}

#[tokio::test]
async fn test_rejected_submission_is_reported_by_responder() {
    let ids = scenario_ids();
    let h = harness(&[ids[0].as_str()], vec![], ids.len());
    let request = RunRequest {
        num_cases: Some(ids.len().to_string()),
        ..Default::default()
    };
    let run = h.coordinator.execute(&request).await.unwrap();

    let Some(CaseOutcome::Error(reply)) = run.outcome(&ids[0]) else {
        panic!("a rejected submission counts as a failed case");
    };
    assert!(reply.starts_with(&format!("Failed to submit changeset (case_id={})", ids[0])));
    assert!(!h.benchmark.submitted_cases("agentbeats-white").contains(&ids[0]));
    assert_eq!(run.failed_cases(), 1);
    assert_eq!(h.benchmark.submitted_cases("agentbeats-white").len(), ids.len() - 1);
    assert_eq!(
        run.status_line(),
        "PowerPoint benchmark score (assertions) for `agentbeats-white`: 94.7%"
    );
    assert!(run
        .markdown()
        .contains(&format!("- `{}`: ERR Failed to submit changeset", ids[0])));
}

#[tokio::test]
async fn test_handle_request_tags_override_config() {
    let h = harness(&[], vec![], 10);
    let status = h
        .coordinator
        .handle_request("<white_agent_id>\nother-agent\n</white_agent_id>\n<num_cases>2</num_cases>")
        .await;

    assert_eq!(status, "PowerPoint benchmark score (assertions) for `other-agent`: 20.0%");
    assert_eq!(h.benchmark.submitted_cases("other-agent").len(), 2);
}
