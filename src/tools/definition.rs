use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
}

impl ToolDefinition {
    /// Function-tool shape expected by the serving endpoint.
    pub fn to_openai(&self) -> Value {
        let description = if self.description.trim().is_empty() {
            self.name.clone()
        } else {
            self.description.clone()
        };
        let parameters = if self.parameters.is_null() {
            serde_json::json!({ "type": "object", "properties": {}, "required": [] })
        } else {
            self.parameters.clone()
        };
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": description,
                "parameters": parameters
            }
        })
    }
}

/// Canonical tool-call request: arguments are always structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// OpenAI wire form, with the arguments re-encoded as a JSON string.
    /// Arguments kept as raw text go back exactly as the model sent them.
    pub fn to_wire(&self) -> Value {
        let arguments = match &self.arguments {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };
        serde_json::json!({
            "id": self.id,
            "type": "function",
            "function": {
                "name": self.name,
                "arguments": arguments
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub arguments: Value,
    pub result: String,
}

/// One executed tool call, as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub iteration: usize,
    pub tool: String,
    pub args: Value,
    pub result: String,
}

/// What a tool implementation hands back before it is reduced to text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Blocks { content: Vec<ToolContent> },
    Text(String),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
    Json { value: Value },
    Resource {
        uri: String,
        #[serde(default)]
        text: Option<String>,
    },
    Nested { content: Vec<ToolContent> },
}

impl ToolOutput {
    pub fn into_text(self) -> String {
        match self {
            ToolOutput::Text(text) => text,
            ToolOutput::Json(Value::String(s)) => s,
            ToolOutput::Json(value) => value.to_string(),
            ToolOutput::Blocks { content } => flatten(&content),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(value: String) -> Self {
        ToolOutput::Text(value)
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Json(value)
    }
}

fn flatten(blocks: &[ToolContent]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            ToolContent::Text { text } => out.push_str(text),
            ToolContent::Json { value } => out.push_str(&value.to_string()),
            ToolContent::Resource { uri, text } => match text {
                Some(text) => out.push_str(text),
                None => out.push_str(uri),
            },
            ToolContent::Nested { content } => out.push_str(&flatten(content)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_blocks_flatten_to_text() {
        let out = ToolOutput::Blocks {
            content: vec![
                ToolContent::Text { text: "a".into() },
                ToolContent::Nested {
                    content: vec![
                        ToolContent::Json { value: json!({"k": 1}) },
                        ToolContent::Resource { uri: "dbfs:/x".into(), text: None },
                    ],
                },
            ],
        };
        assert_eq!(out.into_text(), r#"a{"k":1}dbfs:/x"#);
    }

    #[test]
    fn blocks_decode_from_wire() {
        let out: ToolOutput =
            serde_json::from_value(json!({"content": [{"type": "text", "text": "hi"}]})).unwrap();
        assert_eq!(out.into_text(), "hi");
    }

    #[test]
    fn wire_call_encodes_arguments_as_string() {
        let call = ToolCall {
            id: "t1".into(),
            name: "foo".into(),
            arguments: json!({"x": 1}),
        };
        let wire = call.to_wire();
        assert_eq!(wire["function"]["arguments"], json!(r#"{"x":1}"#));
        assert_eq!(wire["type"], "function");
    }

    #[test]
    fn raw_text_arguments_are_not_reencoded() {
        let call = ToolCall {
            id: "t1".into(),
            name: "foo".into(),
            arguments: json!("{not json"),
        };
        assert_eq!(call.to_wire()["function"]["arguments"], "{not json");
    }

    #[test]
    fn definition_defaults_empty_schema() {
        let def = ToolDefinition {
            name: "health".into(),
            description: String::new(),
            parameters: Value::Null,
        };
        let v = def.to_openai();
        assert_eq!(v["function"]["description"], "health");
        assert_eq!(v["function"]["parameters"]["type"], "object");
    }
}
