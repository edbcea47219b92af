//! Tool-call wire dialects.
//!
//! Models answer with tool requests in one of two shapes: an OpenAI-style
//! `tool_calls` array whose arguments are JSON strings, or Claude-style
//! `tool_use` blocks inside `content` whose `input` is already structured.
//! Both are decoded once here into canonical [`ToolCall`]s.
//!
//! When a reply carries both, the `tool_use` blocks win.

use serde_json::Value;

use crate::llm::provider::{ContentBlock, Message, ReplyContent, ReplyMessage, WireToolCall};
use crate::tools::definition::ToolCall;

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallDialect {
    ClaudeToolUse {
        calls: Vec<ToolCall>,
        text: Option<String>,
    },
    OpenAiToolCalls(Vec<ToolCall>),
    None,
}

impl ToolCallDialect {
    pub fn decode(message: &ReplyMessage) -> Self {
        if let Some(ReplyContent::Blocks(blocks)) = &message.content {
            let calls: Vec<ToolCall> = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: structured_or_empty(input.clone()),
                    }),
                    _ => None,
                })
                .collect();
            if !calls.is_empty() {
                let text: String = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                return ToolCallDialect::ClaudeToolUse {
                    calls,
                    text: Some(text).filter(|t| !t.is_empty()),
                };
            }
        }

        match &message.tool_calls {
            Some(wire) if !wire.is_empty() => {
                ToolCallDialect::OpenAiToolCalls(wire.iter().map(from_wire).collect())
            }
            _ => ToolCallDialect::None,
        }
    }

    pub fn calls(&self) -> &[ToolCall] {
        match self {
            ToolCallDialect::ClaudeToolUse { calls, .. } => calls,
            ToolCallDialect::OpenAiToolCalls(calls) => calls,
            ToolCallDialect::None => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ToolCallDialect::ClaudeToolUse { .. } => "tool_use",
            ToolCallDialect::OpenAiToolCalls(_) => "tool_calls",
            ToolCallDialect::None => "none",
        }
    }

    /// The assistant turn replayed to the model. Claude text alongside the
    /// blocks is kept; OpenAI-dialect content is dropped because some
    /// backends reject content next to `tool_calls`.
    pub fn assistant_message(&self) -> Option<Message> {
        match self {
            ToolCallDialect::ClaudeToolUse { calls, text } => {
                Some(Message::assistant_tool_calls(calls.clone(), text.clone()))
            }
            ToolCallDialect::OpenAiToolCalls(calls) => {
                Some(Message::assistant_tool_calls(calls.clone(), None))
            }
            ToolCallDialect::None => None,
        }
    }
}

fn from_wire(call: &WireToolCall) -> ToolCall {
    ToolCall {
        id: call.id.clone(),
        name: call.function.name.clone(),
        arguments: decode_arguments(&call.function.arguments),
    }
}

/// Decodes JSON-string arguments. Objects pass through, blank strings become
/// `{}`, and undecodable text is kept as a string so the tool can report it.
pub fn decode_arguments(raw: &Value) -> Value {
    match raw {
        Value::String(s) if s.trim().is_empty() => Value::Object(Default::default()),
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        other => structured_or_empty(other.clone()),
    }
}

fn structured_or_empty(value: Value) -> Value {
    if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(v: Value) -> ReplyMessage {
        serde_json::from_value(v).unwrap()
    }

    fn canonical() -> ToolCall {
        ToolCall {
            id: "t1".into(),
            name: "foo".into(),
            arguments: json!({"x": 1}),
        }
    }

    #[test]
    fn both_dialects_normalize_identically() {
        let openai = message(json!({
            "role": "assistant",
            "tool_calls": [{"id": "t1", "type": "function", "function": {"name": "foo", "arguments": "{\"x\":1}"}}]
        }));
        let claude = message(json!({
            "role": "assistant",
            "content": [{"type": "tool_use", "id": "t1", "name": "foo", "input": {"x": 1}}]
        }));

        let a = ToolCallDialect::decode(&openai);
        let b = ToolCallDialect::decode(&claude);
        assert_eq!(a.calls(), &[canonical()]);
        assert_eq!(b.calls(), &[canonical()]);
        assert_eq!(a.label(), "tool_calls");
        assert_eq!(b.label(), "tool_use");
    }

    #[test]
    fn claude_blocks_take_precedence() {
        let both = message(json!({
            "content": [
                {"type": "text", "text": "checking"},
                {"type": "tool_use", "id": "c1", "name": "claude_tool", "input": {}}
            ],
            "tool_calls": [{"id": "o1", "type": "function", "function": {"name": "openai_tool", "arguments": "{}"}}]
        }));
        let dialect = ToolCallDialect::decode(&both);
        assert_eq!(dialect.calls().len(), 1);
        assert_eq!(dialect.calls()[0].name, "claude_tool");
        assert_eq!(
            dialect,
            ToolCallDialect::ClaudeToolUse {
                calls: vec![ToolCall {
                    id: "c1".into(),
                    name: "claude_tool".into(),
                    arguments: json!({}),
                }],
                text: Some("checking".into()),
            }
        );
    }

    #[test]
    fn malformed_arguments_replay_verbatim() {
        let openai = message(json!({
            "tool_calls": [{"id": "t1", "type": "function", "function": {"name": "foo", "arguments": "{not json"}}]
        }));
        let dialect = ToolCallDialect::decode(&openai);
        assert_eq!(dialect.calls()[0].arguments, json!("{not json"));

        let wire = dialect.assistant_message().unwrap().to_wire();
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], "{not json");
    }

    #[test]
    fn claude_text_is_replayed_openai_content_is_not() {
        let claude = message(json!({
            "content": [
                {"type": "text", "text": "Let me look."},
                {"type": "tool_use", "id": "t1", "name": "foo", "input": {"x": 1}}
            ]
        }));
        let replay = ToolCallDialect::decode(&claude).assistant_message().unwrap();
        assert_eq!(replay.content.as_deref(), Some("Let me look."));
        assert_eq!(replay.tool_calls.as_deref(), Some(&[canonical()][..]));

        let openai = message(json!({
            "content": "I'll call foo",
            "tool_calls": [{"id": "t1", "type": "function", "function": {"name": "foo", "arguments": "{\"x\":1}"}}]
        }));
        let replay = ToolCallDialect::decode(&openai).assistant_message().unwrap();
        assert_eq!(replay.content, None);
        assert!(replay.to_wire().get("content").is_none());
    }

    #[test]
    fn plain_answers_have_no_calls() {
        let text = message(json!({"role": "assistant", "content": "4"}));
        assert_eq!(ToolCallDialect::decode(&text), ToolCallDialect::None);

        let empty_array = message(json!({"content": "4", "tool_calls": []}));
        assert_eq!(ToolCallDialect::decode(&empty_array), ToolCallDialect::None);

        let text_blocks = message(json!({"content": [{"type": "text", "text": "4"}]}));
        let dialect = ToolCallDialect::decode(&text_blocks);
        assert_eq!(dialect, ToolCallDialect::None);
        assert!(dialect.assistant_message().is_none());
    }

    #[test]
    fn argument_decoding_edge_cases() {
        assert_eq!(decode_arguments(&json!("")), json!({}));
        assert_eq!(decode_arguments(&json!({"a": 1})), json!({"a": 1}));
        assert_eq!(decode_arguments(&Value::Null), json!({}));
        assert_eq!(decode_arguments(&json!("{not json")), json!("{not json"));
    }
}
