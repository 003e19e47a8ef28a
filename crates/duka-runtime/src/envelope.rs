//! Permissive decoder for the model's action envelope. The model is asked
//! to reply with JSON objects shaped `{"action": "tool_call", ...}` or
//! `{"action": "final_answer", ...}`, but real completions arrive wrapped
//! in code fences, padded with prose, or with several objects back to
//! back. Scan left to right, decode every well-formed object, skip the
//! noise.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// One decoded model action.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentAction {
    ToolCall { tool_name: String, parameters: Value },
    FinalAnswer { message: String },
}

#[derive(Deserialize)]
struct RawEnvelope {
    action: String,
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    parameters: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Decode every action object in a raw completion, in order. An empty
/// result for a non-empty completion means the caller should treat the
/// raw text as the answer.
pub fn decode_actions(raw: &str) -> Vec<AgentAction> {
    let cleaned = strip_code_fences(raw);
    let mut actions = Vec::new();

    for candidate in scan_json_objects(&cleaned) {
        let Ok(envelope) = serde_json::from_str::<RawEnvelope>(candidate) else {
            continue;
        };
        match envelope.action.as_str() {
            "tool_call" => {
                let Some(tool_name) = envelope.tool_name.filter(|n| !n.is_empty()) else {
                    debug!("tool_call envelope missing tool_name, skipping");
                    continue;
                };
                actions.push(AgentAction::ToolCall {
                    tool_name,
                    parameters: envelope.parameters.unwrap_or_else(|| Value::Object(Default::default())),
                });
            }
            "final_answer" => {
                let Some(message) = envelope.message.filter(|m| !m.is_empty()) else {
                    debug!("final_answer envelope missing message, skipping");
                    continue;
                };
                actions.push(AgentAction::FinalAnswer { message });
            }
            other => {
                debug!(action = other, "unrecognized action value, ignoring");
            }
        }
    }

    actions
}

/// Drop ```json fences while keeping whatever they wrapped.
fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }
    trimmed
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Top-level `{...}` spans, string- and escape-aware so braces inside
/// string values never truncate an object.
fn scan_json_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        spans.push(&text[start..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_single_tool_call() {
        let raw = r#"{"action": "tool_call", "tool_name": "get_inventory", "parameters": {"business_id": "biz-1"}}"#;
        let actions = decode_actions(raw);
        assert_eq!(
            actions,
            vec![AgentAction::ToolCall {
                tool_name: "get_inventory".into(),
                parameters: json!({"business_id": "biz-1"}),
            }]
        );
    }

    #[test]
    fn decodes_back_to_back_objects_with_noise_between() {
        let raw = r#"Let me check.
{"action": "tool_call", "tool_name": "get_orders", "parameters": {}}
Here you go:
{"action": "final_answer", "message": "You have one order."}"#;
        let actions = decode_actions(raw);
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], AgentAction::ToolCall { .. }));
        assert!(matches!(actions[1], AgentAction::FinalAnswer { .. }));
    }

    #[test]
    fn strips_code_fences() {
        let raw = "```json\n{\"action\": \"final_answer\", \"message\": \"Hello!\"}\n```";
        let actions = decode_actions(raw);
        assert_eq!(
            actions,
            vec![AgentAction::FinalAnswer { message: "Hello!".into() }]
        );
    }

    #[test]
    fn braces_inside_strings_do_not_truncate() {
        let raw = r#"{"action": "final_answer", "message": "Use {curly} braces and a \" quote"}"#;
        let actions = decode_actions(raw);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn unknown_actions_are_skipped() {
        let raw = r#"{"action": "dance", "message": "??"} {"action": "final_answer", "message": "ok"}"#;
        let actions = decode_actions(raw);
        assert_eq!(actions, vec![AgentAction::FinalAnswer { message: "ok".into() }]);
    }

    #[test]
    fn plain_prose_decodes_nothing() {
        assert!(decode_actions("Sure, here's your answer").is_empty());
    }

    #[test]
    fn nested_objects_decode_whole() {
        let raw = r#"{"action": "tool_call", "tool_name": "create_order", "parameters": {"items": [{"name": "Cake", "qty": 2}]}}"#;
        let actions = decode_actions(raw);
        assert_eq!(actions.len(), 1);
    }
}
