//! State of one evaluation run and its summaries.

use serde::Serialize;

use crate::benchmark::EvaluationResult;
use crate::protocol::CASE_OK_PREFIX;

/// Reply text kept per case.
pub const MAX_RECORDED_REPLY_CHARS: usize = 800;
/// Reply text shown per case in the markdown summary.
const MARKDOWN_PREVIEW_CHARS: usize = 120;

/// What happened to one dispatched case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
    Reply(String),
    Error(String),
}

impl CaseOutcome {
    /// Classifies a counterparty reply. Anything but an `ok:` status is a
    /// failure the counterparty reported for the case.
    pub fn from_reply(text: &str) -> Self {
        let recorded = truncate_chars(text, MAX_RECORDED_REPLY_CHARS).to_string();
        if text.trim_start().starts_with(CASE_OK_PREFIX) {
            CaseOutcome::Reply(recorded)
        } else {
            CaseOutcome::Error(recorded)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CaseOutcome::Error(_))
    }

    /// One-line preview used in summaries.
    pub fn preview(&self) -> String {
        match self {
            CaseOutcome::Reply(text) => truncate_chars(text, MARKDOWN_PREVIEW_CHARS).to_string(),
            CaseOutcome::Error(err) => format!("ERR {}", truncate_chars(err, MARKDOWN_PREVIEW_CHARS)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    pub case_id: String,
    pub outcome: CaseOutcome,
}

/// One end-to-end evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRun {
    pub battle_id: Option<String>,
    pub white_agent_id: String,
    pub requested_count: usize,
    pub selected_cases: Vec<String>,
    /// Outcomes in dispatch order.
    pub outcomes: Vec<CaseRecord>,
    /// Conversation id captured from the first reply that carried one.
    pub conversation_context: Option<String>,
    pub final_result: Option<EvaluationResult>,
}

impl EvaluationRun {
    pub fn new(battle_id: Option<String>, white_agent_id: impl Into<String>, requested_count: usize) -> Self {
        Self {
            battle_id,
            white_agent_id: white_agent_id.into(),
            requested_count,
            selected_cases: Vec::new(),
            outcomes: Vec::new(),
            conversation_context: None,
            final_result: None,
        }
    }

    pub fn record(&mut self, case_id: impl Into<String>, outcome: CaseOutcome) {
        self.outcomes.push(CaseRecord {
            case_id: case_id.into(),
            outcome,
        });
    }

    pub fn outcome(&self, case_id: &str) -> Option<&CaseOutcome> {
        self.outcomes
            .iter()
            .find(|record| record.case_id == case_id)
            .map(|record| &record.outcome)
    }

    pub fn failed_cases(&self) -> usize {
        self.outcomes.iter().filter(|r| r.outcome.is_error()).count()
    }

    /// Score in percent, when the final result carries one.
    pub fn score(&self) -> Option<f64> {
        self.final_result.as_ref().and_then(EvaluationResult::score)
    }

    /// Short status returned to the run's caller.
    pub fn status_line(&self) -> String {
        match self.score() {
            Some(score) => format!(
                "PowerPoint benchmark score (assertions) for `{}`: {:.1}%",
                self.white_agent_id, score
            ),
            None => format!(
                "PowerPoint benchmark score (assertions) for `{}`: unavailable",
                self.white_agent_id
            ),
        }
    }

    /// Human-readable run summary.
    pub fn markdown(&self) -> String {
        let mut out = String::from("## PowerPoint Benchmark Results\n\n");
        out.push_str(&format!("- **white_agent_id**: `{}`\n", self.white_agent_id));
        out.push_str(&format!("- **num_cases_requested**: {}\n", self.requested_count));
        out.push_str(&format!("- **num_cases_dispatched**: {}\n\n", self.selected_cases.len()));

        out.push_str("### Selected cases\n");
        for case_id in &self.selected_cases {
            out.push_str(&format!("- `{case_id}`\n"));
        }

        out.push_str("\n### Per-case status (preview)\n");
        for record in &self.outcomes {
            out.push_str(&format!("- `{}`: {}\n", record.case_id, record.outcome.preview()));
        }

        out.push_str("\n### Evaluation\n```json\n");
        match &self.final_result {
            Some(result) => out.push_str(&result.to_pretty_json()),
            None => out.push_str("null"),
        }
        out.push_str("\n```\n");
        out
    }
}

/// Longest prefix of `s` with at most `max` chars.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((cut, _)) => &s[..cut],
        None => s,
    }
}
