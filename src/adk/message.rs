// SPDX-License-Identifier: MIT

//! Conversation messages and the model reply parser
//!
//! Model replies are expected to be a JSON message envelope, optionally wrapped
//! in a markdown code fence. [`extract_json`] strips the fence with a fixed
//! grammar and parses strictly; [`Message::from_model_text`] falls back to the
//! raw text when that fails.

use crate::adk::error::ParseError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

pub const ROLE_HUMAN: &str = "human";
pub const ROLE_AI: &str = "AI";
pub const ROLE_TOOL_RESPONSE: &str = "tool_response";

const FENCE: &str = "```";

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Result of one tool call, as shown to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub name: String,
    pub content: String,
}

impl ToolResponse {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A message in the conversation history.
///
/// AI messages always carry a `tool_calls` key (`null` when there are none);
/// other roles omit it unless calls are present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let with_calls = self.role == ROLE_AI || self.tool_calls.is_some();
        let mut map = serializer.serialize_map(Some(if with_calls { 3 } else { 2 }))?;
        map.serialize_entry("role", &self.role)?;
        map.serialize_entry("content", &self.content)?;
        if with_calls {
            map.serialize_entry("tool_calls", &self.tool_calls)?;
        }
        map.end()
    }
}

fn default_role() -> String {
    ROLE_AI.to_string()
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_HUMAN.to_string(),
            content: Value::String(content.into()),
            tool_calls: None,
        }
    }

    pub fn ai(content: Value, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Self {
            role: ROLE_AI.to_string(),
            content,
            tool_calls,
        }
    }

    /// Wrap the responses of one tool round into a single message
    pub fn tool_results(responses: Vec<ToolResponse>) -> Self {
        let content = responses
            .into_iter()
            .map(|r| serde_json::json!({"name": r.name, "content": r.content}))
            .collect();
        Self {
            role: ROLE_TOOL_RESPONSE.to_string(),
            content: Value::Array(content),
            tool_calls: None,
        }
    }

    /// Parse raw model output into a message.
    ///
    /// Text that is not a JSON object after fence stripping becomes the
    /// content of an AI message verbatim.
    pub fn from_model_text(raw: &str) -> Self {
        match extract_json(raw) {
            Ok(value @ Value::Object(_)) => match serde_json::from_value::<Message>(value) {
                Ok(message) => message,
                Err(e) => {
                    log::warn!("Model reply is JSON but not a message envelope: {}", e);
                    Self::ai(Value::String(raw.to_string()), None)
                }
            },
            Ok(_) => Self::ai(Value::String(raw.to_string()), None),
            Err(e) => {
                log::warn!("{}", e);
                Self::ai(Value::String(e.raw), None)
            }
        }
    }

    /// Tool calls carried by this message, if any
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    /// Content as display text: strings verbatim, anything else as JSON
    pub fn content_text(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Strip an optional markdown code fence and parse the remainder as JSON.
///
/// Accepted shapes, each with or without one leading and one trailing newline
/// around the fence markers:
/// - ```` ```json\n{...}\n``` ```` (any alphanumeric language tag)
/// - ```` ```\n{...}\n``` ````
/// - `{...}` unfenced
///
/// On failure the error carries the original text unchanged.
pub fn extract_json(raw: &str) -> Result<Value, ParseError> {
    let body = strip_trailing_fence(strip_leading_fence(raw));
    serde_json::from_str(body).map_err(|source| ParseError {
        raw: raw.to_string(),
        source,
    })
}

fn strip_leading_fence(text: &str) -> &str {
    let candidate = text.strip_prefix('\n').unwrap_or(text);
    match candidate.strip_prefix(FENCE) {
        Some(rest) => {
            let tag_len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
                .unwrap_or(rest.len());
            let rest = &rest[tag_len..];
            rest.strip_prefix('\n').unwrap_or(rest)
        }
        None => text,
    }
}

fn strip_trailing_fence(text: &str) -> &str {
    let candidate = text.strip_suffix('\n').unwrap_or(text);
    match candidate.strip_suffix(FENCE) {
        Some(rest) => rest.strip_suffix('\n').unwrap_or(rest),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CANONICAL: &str = r#"{"role": "AI", "content": "hi", "tool_calls": null}"#;

    fn fence_variants(body: &str) -> Vec<String> {
        vec![
            format!("```json\n{}\n```", body),
            format!("```json{}```", body),
            format!("\n```json\n{}\n```\n", body),
            format!("```\n{}\n```", body),
            format!("```{}```", body),
            format!("```\n{}```\n", body),
            body.to_string(),
        ]
    }

    #[test]
    fn test_fence_variants_parse_to_same_value() {
        let expected: Value = serde_json::from_str(CANONICAL).unwrap();
        for variant in fence_variants(CANONICAL) {
            let parsed = extract_json(&variant)
                .unwrap_or_else(|e| panic!("variant {:?} failed: {}", variant, e));
            assert_eq!(parsed, expected, "variant {:?}", variant);
        }
    }

    #[test]
    fn test_malformed_json_returns_original_text() {
        for variant in fence_variants(r#"{"role": "AI", "content": "#) {
            let err = extract_json(&variant).unwrap_err();
            assert_eq!(err.raw, variant);
        }
    }

    #[test]
    fn test_other_language_tag_is_stripped() {
        let parsed = extract_json("```JSON5\n{\"a\": 1}\n```").unwrap();
        assert_eq!(parsed, json!({"a": 1}));
    }

    #[test]
    fn test_from_model_text_parses_tool_calls() {
        let raw = r#"```json
{"role": "AI", "content": "Adding.", "tool_calls": [{"name": "add", "arguments": {"a": 2, "b": 3}}]}
```"#;
        let message = Message::from_model_text(raw);
        assert_eq!(message.role, "AI");
        assert_eq!(message.content, json!("Adding."));
        assert_eq!(
            message.pending_tool_calls(),
            &[ToolCall::new("add", json!({"a": 2, "b": 3}))]
        );
    }

    #[test]
    fn test_from_model_text_falls_back_to_raw() {
        let message = Message::from_model_text("Sure, the answer is 5.");
        assert_eq!(message.role, ROLE_AI);
        assert_eq!(message.content, json!("Sure, the answer is 5."));
        assert!(message.pending_tool_calls().is_empty());
    }

    #[test]
    fn test_from_model_text_non_object_json_is_raw() {
        let message = Message::from_model_text("[1, 2]");
        assert_eq!(message.content, json!("[1, 2]"));
    }

    #[test]
    fn test_missing_role_defaults_to_ai() {
        let message = Message::from_model_text(r#"{"content": {"answer": 5}}"#);
        assert_eq!(message.role, ROLE_AI);
        assert_eq!(message.content, json!({"answer": 5}));
    }

    #[test]
    fn test_tool_results_envelope() {
        let message = Message::tool_results(vec![ToolResponse::new("add", "5")]);
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"role": "tool_response", "content": [{"name": "add", "content": "5"}]})
        );
    }

    #[test]
    fn test_human_message_wire_shape() {
        let message = Message::human("hello");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"role": "human", "content": "hello"})
        );
    }

    #[test]
    fn test_ai_message_always_carries_tool_calls() {
        let plain = Message::ai(json!("hi"), None);
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({"role": "AI", "content": "hi", "tool_calls": null})
        );

        let calling = Message::ai(json!(""), Some(vec![ToolCall::new("add", json!({"a": 1}))]));
        assert_eq!(
            serde_json::to_value(&calling).unwrap()["tool_calls"],
            json!([{"name": "add", "arguments": {"a": 1}}])
        );
    }
}
