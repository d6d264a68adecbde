//! JSON object extraction from LLM responses.
//!
//! Models asked for "only JSON" still wrap it in code fences or prose now and
//! then. Strategies, in order:
//! 1. The whole (trimmed) response parses as JSON
//! 2. A ```json fenced block
//! 3. A generic ``` fenced block
//! 4. The first balanced `{...}` that parses
//!
//! # Example
//!
//! ```
//! use deckbench::utils::json_extraction::extract_json_object;
//!
//! let response = "Here you go:\n```json\n{\"added\": [], \"modified\": [], \"deleted\": []}\n```";
//! let object = extract_json_object(response).unwrap();
//! assert!(object.contains_key("modified"));
//! ```

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Error type for JSON extraction failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JsonExtractionError {
    #[error("JSON appears truncated: {unclosed_braces} unclosed braces")]
    Truncated { unclosed_braces: usize },

    #[error("Response JSON is not an object (found {found})")]
    NotAnObject { found: &'static str },

    #[error("No JSON content found in response. Content starts with: '{content_preview}'")]
    NotFound { content_preview: String },
}

/// Extracts a JSON object from an LLM response.
///
/// A response that is valid JSON but not an object (an array, a string) is an
/// error rather than a fallback to searching inside it.
pub fn extract_json_object(content: &str) -> Result<Map<String, Value>, JsonExtractionError> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return into_object(value);
    }

    let fenced = extract_from_code_block(trimmed, r"```json\s*\n?([\s\S]*?)\n?```")
        .or_else(|| extract_from_code_block(trimmed, r"```(?:\w+)?\s*\n?([\s\S]*?)\n?```"));
    if let Some(value) = fenced {
        return into_object(value);
    }

    let mut search_from = 0;
    while let Some(offset) = trimmed[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = find_matching_brace(&trimmed[start..]) {
            let candidate = &trimmed[start..=start + end];
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
                return into_object(value);
            }
        }
        search_from = start + 1;
    }

    if let Some(start) = trimmed.find('{') {
        let unclosed_braces = unclosed_braces(&trimmed[start..]);
        if unclosed_braces > 0 {
            return Err(JsonExtractionError::Truncated { unclosed_braces });
        }
    }

    let content_preview = trimmed.chars().take(50).collect();
    Err(JsonExtractionError::NotFound { content_preview })
}

fn into_object(value: Value) -> Result<Map<String, Value>, JsonExtractionError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(JsonExtractionError::NotAnObject { found: "array" }),
        Value::String(_) => Err(JsonExtractionError::NotAnObject { found: "string" }),
        Value::Number(_) => Err(JsonExtractionError::NotAnObject { found: "number" }),
        Value::Bool(_) => Err(JsonExtractionError::NotAnObject { found: "boolean" }),
        Value::Null => Err(JsonExtractionError::NotAnObject { found: "null" }),
    }
}

/// Parses the first fenced block matching `pattern` that holds valid JSON.
fn extract_from_code_block(content: &str, pattern: &str) -> Option<Value> {
    let re = Regex::new(pattern).ok()?;
    let parsed = re
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .find_map(|block| serde_json::from_str(block.as_str().trim()).ok());
    parsed
}

/// Index of the `}` closing the object `s` starts with.
///
/// Braces inside string literals (including escaped quotes) are ignored.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

fn unclosed_braces(s: &str) -> usize {
    let mut depth: isize = 0;
    let mut in_string = false;
    let mut escape_next = false;
    for c in s.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => depth -= 1,
            _ => {}
        }
    }
    depth.max(0) as usize
}
