//! Agentic tool loop
//!
//! Conversation → model → if tool calls, run them in order and feed the
//! results back → repeat until the model answers in plain text or the
//! iteration ceiling is reached.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::agents::dialect::ToolCallDialect;
use crate::error::AppError;
use crate::llm::provider::{Message, ModelClient, ReplyContent};
use crate::trace::store::truncate;
use crate::trace::{SpanType, Status, TraceStore};
use crate::tools::definition::{ToolCall, ToolCallRecord, ToolDefinition, ToolResult};
use crate::tools::executor::ToolInvoker;

pub const FINISH_MAX_ITERATIONS: &str = "max_iterations";
pub const FINISH_EMPTY_REPLY: &str = "empty_response";
pub const MAX_ITERATIONS_RESPONSE: &str = "Agent reached maximum iterations";

#[derive(Debug, Clone)]
pub struct AgentLoopConfig {
    /// Serving endpoint name.
    pub model: String,
    pub max_tokens: u32,
    /// Model calls allowed before a forced stop.
    pub max_iterations: usize,
    pub system_prompt: String,
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub response: String,
    pub iterations: usize,
    pub tool_calls: Vec<ToolCallRecord>,
    pub finish_reason: String,
    #[serde(default)]
    pub trace_id: Option<String>,
}

pub struct AgentLoop<'a> {
    model: &'a dyn ModelClient,
    tools: &'a dyn ToolInvoker,
    traces: &'a TraceStore,
}

impl<'a> AgentLoop<'a> {
    pub fn new(model: &'a dyn ModelClient, tools: &'a dyn ToolInvoker, traces: &'a TraceStore) -> Self {
        Self {
            model,
            tools,
            traces,
        }
    }

    /// Runs the loop for `messages`, prefixed with the configured system
    /// prompt. With a `trace_id` the run is recorded under an `agent` root
    /// span and the trace is completed when the run resolves.
    pub async fn run(
        &self,
        messages: Vec<Message>,
        catalog: &[ToolDefinition],
        config: &AgentLoopConfig,
        trace_id: Option<&str>,
    ) -> Result<AgentOutcome, AppError> {
        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(Message::system(config.system_prompt.clone()));
        conversation.extend(messages);

        let Some(trace_id) = trace_id else {
            return self.iterate(conversation, catalog, config, None, None).await;
        };

        let inputs = json!({ "messages": message_previews(&conversation[1..]) });
        let result = self
            .traces
            .span_scope(trace_id, "agent", Some(inputs), None, SpanType::Agent, |root| {
                self.iterate(conversation, catalog, config, Some(trace_id), root)
            })
            .await;

        let status = if result.is_ok() {
            Status::Success
        } else {
            Status::Error
        };
        if let Err(e) = self.traces.complete_trace(trace_id, status) {
            warn!(trace_id, error = %e, "trace evicted before completion");
        }

        result.map(|outcome| AgentOutcome {
            trace_id: Some(trace_id.to_string()),
            ..outcome
        })
    }

    async fn iterate(
        &self,
        mut conversation: Vec<Message>,
        catalog: &[ToolDefinition],
        config: &AgentLoopConfig,
        trace_id: Option<&str>,
        root_span: Option<String>,
    ) -> Result<AgentOutcome, AppError> {
        let mut records: Vec<ToolCallRecord> = Vec::new();

        for iteration in 1..=config.max_iterations {
            info!(iteration, messages = conversation.len(), model = %config.model, "agent loop iteration");

            let llm_span = self.open_span(
                trace_id,
                &format!("llm:/serving-endpoints/{}/invocations", config.model),
                Some(json!({ "messages": message_previews(&conversation) })),
                root_span.as_deref(),
                SpanType::Llm,
            );

            let reply = match self
                .model
                .call(&conversation, catalog, &config.model, config.max_tokens)
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    self.close_span(
                        trace_id,
                        llm_span.as_deref(),
                        json!({ "error": e.to_string() }),
                        Status::Error,
                    );
                    return Err(e);
                }
            };
            self.close_span(
                trace_id,
                llm_span.as_deref(),
                json!({ "response": reply }),
                Status::Success,
            );

            let Some(choice) = reply.first_choice() else {
                warn!(iteration, "model reply has no choices, stopping");
                return Ok(AgentOutcome {
                    response: String::new(),
                    iterations: iteration,
                    tool_calls: records,
                    finish_reason: FINISH_EMPTY_REPLY.to_string(),
                    trace_id: None,
                });
            };

            let finish_reason = choice
                .finish_reason
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            let dialect = ToolCallDialect::decode(&choice.message);
            debug!(iteration, finish_reason = %finish_reason, dialect = dialect.label(), "model replied");

            let Some(assistant) = dialect.assistant_message() else {
                let response = choice
                    .message
                    .content
                    .as_ref()
                    .map(ReplyContent::text)
                    .unwrap_or_default();
                conversation.push(Message::assistant(response.clone()));
                info!(iteration, tool_calls = records.len(), "agent produced final answer");
                return Ok(AgentOutcome {
                    response,
                    iterations: iteration,
                    tool_calls: records,
                    finish_reason,
                    trace_id: None,
                });
            };
            conversation.push(assistant);

            // Strictly sequential: later results may depend on earlier ones.
            for call in dialect.calls() {
                let result = self.run_tool(call, trace_id, llm_span.as_deref()).await;
                conversation.push(Message::tool(result.tool_call_id, result.result.clone()));
                records.push(ToolCallRecord {
                    iteration,
                    tool: result.name,
                    args: result.arguments,
                    result: result.result,
                });
            }
        }

        warn!(max_iterations = config.max_iterations, "agent loop hit iteration limit");
        Ok(AgentOutcome {
            response: MAX_ITERATIONS_RESPONSE.to_string(),
            iterations: config.max_iterations,
            tool_calls: records,
            finish_reason: FINISH_MAX_ITERATIONS.to_string(),
            trace_id: None,
        })
    }

    async fn run_tool(&self, call: &ToolCall, trace_id: Option<&str>, parent: Option<&str>) -> ToolResult {
        info!(tool = %call.name, tool_call_id = %call.id, "executing tool");
        let span = self.open_span(
            trace_id,
            &call.name,
            Some(call.arguments.clone()),
            parent,
            SpanType::Tool,
        );

        let raw = self.tools.execute(&call.name, &call.arguments).await;
        let result = non_empty_result(&call.name, raw);

        self.close_span(
            trace_id,
            span.as_deref(),
            json!({ "result": result }),
            Status::Success,
        );

        ToolResult {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
        }
    }

    fn open_span(
        &self,
        trace_id: Option<&str>,
        name: &str,
        inputs: Option<Value>,
        parent: Option<&str>,
        span_type: SpanType,
    ) -> Option<String> {
        let trace_id = trace_id?;
        match self.traces.add_span(trace_id, name, inputs, parent, span_type) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(trace_id, span = name, error = %e, "span not recorded");
                None
            }
        }
    }

    fn close_span(&self, trace_id: Option<&str>, span_id: Option<&str>, outputs: Value, status: Status) {
        if let (Some(trace_id), Some(span_id)) = (trace_id, span_id) {
            self.traces.complete_span(trace_id, span_id, Some(outputs), status);
        }
    }
}

/// An empty tool message is ambiguous to the model, so it never goes out empty.
pub fn non_empty_result(tool: &str, raw: String) -> String {
    if raw.trim().is_empty() {
        format!("Tool {tool} completed successfully (no output)")
    } else {
        raw
    }
}

fn message_previews(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            json!({
                "role": m.role,
                "content_preview": truncate(m.content.as_deref().unwrap_or_default(), 100)
            })
        })
        .collect()
}
