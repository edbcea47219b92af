use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::tools::definition::{ToolCall, ToolDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One conversation entry. Assistant messages may carry canonical tool calls;
/// tool messages answer one of them by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    fn plain(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::Assistant, content)
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>, content: Option<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content,
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    /// Request form. Tool calls always go out OpenAI-style, whatever the model family.
    pub fn to_wire(&self) -> Value {
        let role = match self.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };

        let mut out = serde_json::Map::new();
        out.insert("role".to_string(), Value::String(role.to_string()));
        if let Some(content) = &self.content {
            out.insert("content".to_string(), Value::String(content.clone()));
        }
        if let Some(tool_call_id) = &self.tool_call_id {
            out.insert(
                "tool_call_id".to_string(),
                Value::String(tool_call_id.clone()),
            );
        }
        if let Some(tool_calls) = &self.tool_calls {
            let mapped = tool_calls.iter().map(ToolCall::to_wire).collect();
            out.insert("tool_calls".to_string(), Value::Array(mapped));
        }
        Value::Object(out)
    }
}

/// Raw serving-endpoint reply. Only the first choice is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelReply {
    #[serde(default)]
    pub choices: Vec<ReplyChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ModelReply {
    pub fn first_choice(&self) -> Option<&ReplyChoice> {
        self.choices.first()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyChoice {
    #[serde(default)]
    pub message: ReplyMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ReplyContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

/// Message content is a plain string for most models and a list of typed
/// blocks for Claude-family endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyContent {
    Text(String),
    Blocks(#[serde(deserialize_with = "lenient_blocks")] Vec<ContentBlock>),
}

/// Non-object items are skipped and malformed objects become
/// [`ContentBlock::Other`], so one odd item never sinks the whole reply.
fn lenient_blocks<'de, D>(deserializer: D) -> Result<Vec<ContentBlock>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let items = Vec::<Value>::deserialize(deserializer)?;
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .map(|item| serde_json::from_value(item).unwrap_or(ContentBlock::Other))
        .collect())
}

impl ReplyContent {
    /// Concatenated text, ignoring non-text blocks.
    pub fn text(&self) -> String {
        match self {
            ReplyContent::Text(s) => s.clone(),
            ReplyContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub function: WireFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    /// Normally a JSON-encoded string; some backends send the object itself.
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// One request to the model endpoint. No retries.
    async fn call(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        max_tokens: u32,
    ) -> Result<ModelReply, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_block_content_with_unknown_kinds() {
        let reply: ModelReply = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": [
                        {"type": "text", "text": "Let me check. "},
                        {"type": "thinking", "thinking": "..."},
                        {"type": "tool_use", "id": "t1", "name": "foo", "input": {"x": 1}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let content = reply.first_choice().unwrap().message.content.clone().unwrap();
        assert_eq!(content.text(), "Let me check. ");
        let ReplyContent::Blocks(blocks) = content else {
            panic!("expected blocks");
        };
        assert_eq!(blocks[1], ContentBlock::Other);
    }

    #[test]
    fn stray_content_items_are_skipped() {
        let reply: ModelReply = serde_json::from_value(json!({
            "choices": [{"message": {"content": [
                {"type": "text", "text": "hi"},
                "bare",
                42,
                {"type": "tool_use", "name": "no_id"}
            ]}}]
        }))
        .unwrap();

        let content = reply.first_choice().unwrap().message.content.clone().unwrap();
        assert_eq!(content.text(), "hi");
        let ReplyContent::Blocks(blocks) = content else {
            panic!("expected blocks");
        };
        assert_eq!(blocks, vec![ContentBlock::Text { text: "hi".into() }, ContentBlock::Other]);
    }

    #[test]
    fn missing_choices_decode_as_empty() {
        let reply: ModelReply = serde_json::from_value(json!({"object": "error"})).unwrap();
        assert!(reply.first_choice().is_none());
    }

    #[test]
    fn tool_message_wire_shape() {
        let wire = Message::tool("t1", "ok").to_wire();
        assert_eq!(wire, json!({"role": "tool", "tool_call_id": "t1", "content": "ok"}));
    }

    #[test]
    fn assistant_tool_calls_omit_absent_content() {
        let call = ToolCall {
            id: "t1".into(),
            name: "foo".into(),
            arguments: json!({"x": 1}),
        };
        let wire = Message::assistant_tool_calls(vec![call], None).to_wire();
        assert!(wire.get("content").is_none());
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], r#"{"x":1}"#);
    }
}
