//! Text protocol spoken between the coordinator and the counterparty.
//!
//! Requests are natural-language messages with machine-readable
//! `<tag>value</tag>` fields; replies are wrapped in a `<json>` envelope.

pub mod envelope;
pub mod tags;

pub use envelope::{ensure_json_envelope, parse_envelope, reply_text, ReplyAction, RESPOND_ACTION_NAME};
pub use tags::{
    render_tag, TaggedFields, TAG_BATTLE_ID, TAG_BENCHMARK_API_URL, TAG_CASE_ID, TAG_NUM_CASES,
    TAG_WHITE_AGENT_ID, TAG_WHITE_AGENT_URL,
};

/// Prefix of the status a counterparty returns for a handled case.
pub const CASE_OK_PREFIX: &str = "ok:";

/// One case handed to the counterparty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRequest {
    pub benchmark_api_url: String,
    pub case_id: String,
    pub white_agent_id: String,
    pub battle_id: Option<String>,
}

impl CaseRequest {
    /// Renders the request message.
    pub fn render(&self) -> String {
        let fields = [
            render_tag(TAG_BENCHMARK_API_URL, &self.benchmark_api_url),
            render_tag(TAG_CASE_ID, &self.case_id),
            render_tag(TAG_WHITE_AGENT_ID, &self.white_agent_id),
            render_tag(TAG_BATTLE_ID, self.battle_id.as_deref().unwrap_or_default()),
        ];
        format!(
            "You are the white agent for the PowerPoint benchmark.\n\
             Handle exactly one case, then respond with a short status.\n\n{}",
            fields.join("\n")
        )
    }

    /// Reads a request back from message text. Requires a case id.
    pub fn from_tags(tags: &TaggedFields) -> Option<Self> {
        Some(Self {
            case_id: tags.get(TAG_CASE_ID)?.to_string(),
            benchmark_api_url: tags.get(TAG_BENCHMARK_API_URL).unwrap_or_default().to_string(),
            white_agent_id: tags.get(TAG_WHITE_AGENT_ID).unwrap_or_default().to_string(),
            battle_id: tags.get(TAG_BATTLE_ID).map(str::to_string),
        })
    }
}

/// Run request handed to the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub white_agent_url: Option<String>,
    pub benchmark_api_url: Option<String>,
    pub white_agent_id: Option<String>,
    pub num_cases: Option<String>,
    pub battle_id: Option<String>,
}

impl RunRequest {
    pub fn from_text(text: &str) -> Self {
        let tags = TaggedFields::parse(text);
        let owned = |name: &str| tags.get(name).map(str::to_string);
        Self {
            white_agent_url: owned(TAG_WHITE_AGENT_URL),
            benchmark_api_url: owned(TAG_BENCHMARK_API_URL),
            white_agent_id: owned(TAG_WHITE_AGENT_ID),
            num_cases: owned(TAG_NUM_CASES),
            battle_id: owned(TAG_BATTLE_ID),
        }
    }

    /// Renders a run request the coordinator can parse back.
    pub fn render(&self) -> String {
        let mut lines = vec!["Run the PowerPoint benchmark against the agent below.".to_string()];
        let fields = [
            (TAG_WHITE_AGENT_URL, &self.white_agent_url),
            (TAG_BENCHMARK_API_URL, &self.benchmark_api_url),
            (TAG_NUM_CASES, &self.num_cases),
            (TAG_WHITE_AGENT_ID, &self.white_agent_id),
            (TAG_BATTLE_ID, &self.battle_id),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                lines.push(render_tag(name, value));
            }
        }
        lines.join("\n")
    }
}
