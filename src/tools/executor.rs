use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::tools::definition::{ToolDefinition, ToolOutput};

#[derive(Debug, Clone)]
pub struct ToolLimits {
    pub timeout_ms: u64,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self { timeout_ms: 60_000 }
    }
}

/// A callable tool, local or remote.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, args: Value) -> Result<ToolOutput, AppError>;
}

/// Runs a named tool and always produces text. Failures and unknown names
/// come back as text too, so a bad tool never ends the conversation.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn execute(&self, name: &str, args: &Value) -> String;
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    limits: ToolLimits,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: ToolLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "tool registered twice, keeping the latest");
        }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolInvoker for ToolRegistry {
    async fn execute(&self, name: &str, args: &Value) -> String {
        let Some(tool) = self.tools.get(name).cloned() else {
            warn!(tool = name, "model requested an unknown tool");
            return not_found(name, &self.names());
        };

        let started = Instant::now();
        let timeout = Duration::from_millis(self.limits.timeout_ms);
        let output = match tokio::time::timeout(timeout, tool.call(args.clone())).await {
            Ok(res) => res,
            Err(_) => Err(AppError::Tool(format!(
                "timed out after {}ms",
                self.limits.timeout_ms
            ))),
        };

        let duration_ms = started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
        match output {
            Ok(out) => {
                debug!(tool = name, duration_ms, "tool finished");
                out.into_text()
            }
            Err(e) => {
                warn!(tool = name, duration_ms, error = %e, "tool failed");
                format!("Error executing tool {name}: {e}")
            }
        }
    }
}

fn not_found(name: &str, available: &[String]) -> String {
    serde_json::json!({
        "error": "tool_not_found",
        "message": format!("Tool {name} not found"),
        "available_tools": available
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".into(),
                description: "Echo msg".into(),
                parameters: json!({"type": "object", "properties": {"msg": {"type": "string"}}}),
            }
        }

        async fn call(&self, args: Value) -> Result<ToolOutput, AppError> {
            let msg = args
                .get("msg")
                .and_then(|v| v.as_str())
                .ok_or_else(|| AppError::Tool("Missing msg".into()))?;
            Ok(ToolOutput::Text(msg.to_string()))
        }
    }

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "slow".into(),
                description: String::new(),
                parameters: Value::Null,
            }
        }

        async fn call(&self, _args: Value) -> Result<ToolOutput, AppError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolOutput::Text("late".into()))
        }
    }

    fn registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new().with_limits(ToolLimits { timeout_ms: 50 });
        reg.register(Arc::new(Echo));
        reg.register(Arc::new(Slow));
        reg
    }

    #[tokio::test]
    async fn executes_registered_tool() {
        assert_eq!(registry().execute("echo", &json!({"msg": "hi"})).await, "hi");
    }

    #[tokio::test]
    async fn unknown_tool_is_structured_text() {
        let out = registry().execute("nope", &json!({})).await;
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["error"], "tool_not_found");
        assert_eq!(v["message"], "Tool nope not found");
        assert_eq!(v["available_tools"], json!(["echo", "slow"]));
    }

    #[tokio::test]
    async fn tool_failure_is_tagged_with_name() {
        let out = registry().execute("echo", &json!({})).await;
        assert_eq!(out, "Error executing tool echo: Tool error: Missing msg");
    }

    #[tokio::test]
    async fn timeout_becomes_error_text() {
        let out = registry().execute("slow", &json!({})).await;
        assert!(out.starts_with("Error executing tool slow:"));
        assert!(out.contains("timed out"));
    }
}
