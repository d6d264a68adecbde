//! Scanner for `<tag>value</tag>` fields embedded in request text.
//!
//! Grammar, informally:
//!
//! ```text
//! field := "<" name ">" value "</" name ">"
//! name  := [A-Za-z0-9_-]+
//! value := any text not containing "</" name ">"
//! ```
//!
//! Values are not escaped and fields do not nest: a value runs to the first
//! matching close tag. The first occurrence of a name wins. Leading and
//! trailing whitespace of a value is trimmed, since requests put values on
//! their own lines.

use std::collections::HashMap;

/// Tag carrying the battle/session id.
pub const TAG_BATTLE_ID: &str = "battle_id";
/// Tag carrying the counterparty endpoint.
pub const TAG_WHITE_AGENT_URL: &str = "white_agent_url";
/// Tag carrying the benchmark service base URL.
pub const TAG_BENCHMARK_API_URL: &str = "benchmark_api_url";
/// Tag carrying one case identifier.
pub const TAG_CASE_ID: &str = "case_id";
/// Tag carrying the agent id submissions and results are keyed by.
pub const TAG_WHITE_AGENT_ID: &str = "white_agent_id";
/// Tag carrying the requested number of cases.
pub const TAG_NUM_CASES: &str = "num_cases";

/// Tag name → value mapping parsed from one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggedFields {
    fields: HashMap<String, String>,
}

impl TaggedFields {
    /// Parses every well-formed field in `text`.
    pub fn parse(text: &str) -> Self {
        let mut fields = HashMap::new();
        let mut rest = text;

        while let Some(open) = rest.find('<') {
            let after_open = &rest[open + 1..];
            let Some(name_len) = tag_name_len(after_open) else {
                rest = after_open;
                continue;
            };
            let name = &after_open[..name_len];
            let body = &after_open[name_len + 1..];
            let close = format!("</{name}>");

            match body.find(&close) {
                Some(end) => {
                    fields
                        .entry(name.to_string())
                        .or_insert_with(|| body[..end].trim().to_string());
                    rest = &body[end + close.len()..];
                }
                None => rest = after_open,
            }
        }

        Self { fields }
    }

    /// Value of a tag, if present. Empty values count as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Length of a tag name followed by `>`, or `None` if `s` does not start with one.
fn tag_name_len(s: &str) -> Option<usize> {
    let len = s
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
        .count();
    (len > 0 && s.as_bytes().get(len) == Some(&b'>')).then_some(len)
}

/// Renders one field on its own lines, the layout requests use.
pub fn render_tag(name: &str, value: &str) -> String {
    format!("<{name}>\n{value}\n</{name}>")
}
