//! `<json>{...}</json>` reply envelope.
//!
//! Counterparty replies carry an action object
//! `{"name": "respond", "kwargs": {"content": "..."}}` wrapped in `<json>`
//! tags. Anything else is coerced into that shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action name for a plain textual response.
pub const RESPOND_ACTION_NAME: &str = "respond";

const OPEN: &str = "<json>";
const CLOSE: &str = "</json>";

/// Action object carried inside the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyAction {
    pub name: String,
    pub kwargs: Value,
}

impl ReplyAction {
    /// A `respond` action with the given content.
    pub fn respond(content: impl Into<String>) -> Self {
        Self {
            name: RESPOND_ACTION_NAME.to_string(),
            kwargs: serde_json::json!({ "content": content.into() }),
        }
    }

    /// Wraps the action in the envelope.
    pub fn to_envelope(&self) -> String {
        // Serializing a String and a Value cannot fail.
        let body = serde_json::to_string(self).unwrap_or_default();
        format!("{OPEN}{body}{CLOSE}")
    }

    /// `kwargs.content` when it is a string.
    pub fn content(&self) -> Option<&str> {
        self.kwargs.get("content").and_then(Value::as_str)
    }
}

/// Coerces arbitrary reply text into the envelope.
///
/// Text already containing both envelope tags is returned unchanged. Bare JSON
/// objects with `name` and `kwargs` are wrapped as they are; everything else
/// becomes a `respond` action whose content is the trimmed text.
pub fn ensure_json_envelope(content: &str) -> String {
    if content.contains(OPEN) && content.contains(CLOSE) {
        return content.to_string();
    }
    let stripped = content.trim();
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(stripped) {
        if obj.contains_key("name") && obj.contains_key("kwargs") {
            let body = Value::Object(obj).to_string();
            return format!("{OPEN}{body}{CLOSE}");
        }
    }
    ReplyAction::respond(stripped).to_envelope()
}

/// Extracts the action from an envelope, if one is present and well formed.
pub fn parse_envelope(text: &str) -> Option<ReplyAction> {
    let start = text.find(OPEN)? + OPEN.len();
    let end = start + text[start..].find(CLOSE)?;
    serde_json::from_str(&text[start..end]).ok()
}

/// Human-readable text of a reply: the `respond` content when enveloped,
/// otherwise the raw text.
pub fn reply_text(text: &str) -> String {
    parse_envelope(text)
        .and_then(|action| action.content().map(str::to_string))
        .unwrap_or_else(|| text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wraps_plain_text() {
        let wrapped = ensure_json_envelope("  ok: case-1 (submitted) \n");
        let action = parse_envelope(&wrapped).expect("envelope parses");
        assert_eq!(action.name, RESPOND_ACTION_NAME);
        assert_eq!(action.content(), Some("ok: case-1 (submitted)"));
    }

    #[test]
    fn test_existing_envelope_is_untouched() {
        let text = r#"prefix <json>{"name":"respond","kwargs":{"content":"x"}}</json>"#;
        assert_eq!(ensure_json_envelope(text), text);
    }

    #[test]
    fn test_bare_action_json_is_wrapped_as_is() {
        let wrapped = ensure_json_envelope(r#"{"name": "lookup", "kwargs": {"q": 1}}"#);
        let action = parse_envelope(&wrapped).expect("envelope parses");
        assert_eq!(action.name, "lookup");
        assert_eq!(action.kwargs, json!({"q": 1}));
    }

    #[test]
    fn test_other_json_becomes_respond_content() {
        let wrapped = ensure_json_envelope(r#"{"score": 3}"#);
        let action = parse_envelope(&wrapped).expect("envelope parses");
        assert_eq!(action.content(), Some(r#"{"score": 3}"#));
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let once = ensure_json_envelope("hello");
        assert_eq!(ensure_json_envelope(&once), once);
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(reply_text(&ReplyAction::respond("done").to_envelope()), "done");
        assert_eq!(reply_text(" free text "), "free text");
        assert_eq!(reply_text("<json>not json</json>"), "<json>not json</json>");
    }
}
