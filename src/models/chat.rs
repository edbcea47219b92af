use serde::{Deserialize, Serialize};

use crate::llm::provider::{Message, MessageRole};
use crate::tools::definition::ToolCallRecord;
use crate::trace::store::truncate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl From<ChatMessage> for Message {
    fn from(m: ChatMessage) -> Self {
        match m.role {
            MessageRole::System => Message::system(m.content),
            MessageRole::Assistant => Message::assistant(m.content),
            // Tool messages need a call id, which plain chat history lacks.
            MessageRole::User | MessageRole::Tool => Message::user(m.content),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl AgentChatRequest {
    /// Metadata stored on the request's trace.
    pub fn trace_metadata(&self, model: &str) -> serde_json::Value {
        serde_json::json!({
            "model": model,
            "message_count": self.messages.len(),
            "first_message": self
                .messages
                .first()
                .map(|m| truncate(&m.content, 100))
                .unwrap_or_default()
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentChatResponse {
    pub response: String,
    pub iterations: usize,
    pub tool_calls: Vec<ToolCallRecord>,
    pub finish_reason: String,
    pub trace_id: Option<String>,
}
