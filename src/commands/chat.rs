use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::{error, info, warn};

use crate::agents::prompt::resolve_system_prompt;
use crate::agents::{AgentLoop, AgentLoopConfig};
use crate::auth::user_token;
use crate::error::AppError;
use crate::llm::provider::Message;
use crate::models::chat::{AgentChatRequest, AgentChatResponse};
use crate::state::AppState;
use crate::trace::Status;

/// `POST /api/agent/chat`
pub async fn agent_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AgentChatRequest>,
) -> Result<Json<AgentChatResponse>, AppError> {
    let model = req
        .model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.config.default_model.clone());
    let trace_id = state.traces.create_trace(req.trace_metadata(&model));
    info!(trace_id = %trace_id, model = %model, messages = req.messages.len(), "agent chat request");

    let token = user_token(&headers);
    let prepared = match state.models.client_for(token.as_deref()) {
        Ok(client) => state.catalog.load(false).await.map(|tools| (client, tools)),
        Err(e) => Err(e),
    };
    let (client, tools) = match prepared {
        Ok(p) => p,
        Err(e) => {
            error!(trace_id = %trace_id, error = %e, "agent chat setup failed");
            if let Err(e) = state.traces.complete_trace(&trace_id, Status::Error) {
                warn!(trace_id = %trace_id, error = %e, "trace evicted before completion");
            }
            return Err(e);
        }
    };

    let config = AgentLoopConfig {
        model,
        max_tokens: req.max_tokens.unwrap_or(state.config.max_tokens),
        max_iterations: state.config.max_iterations,
        system_prompt: resolve_system_prompt(req.system_prompt.as_deref()),
    };
    let messages: Vec<Message> = req.messages.into_iter().map(Message::from).collect();

    let outcome = AgentLoop::new(client.as_ref(), state.registry.as_ref(), &state.traces)
        .run(messages, &tools, &config, Some(&trace_id))
        .await
        .inspect_err(|e| error!(trace_id = %trace_id, error = %e, "agent chat failed"))?;

    Ok(Json(AgentChatResponse {
        response: outcome.response,
        iterations: outcome.iterations,
        tool_calls: outcome.tool_calls,
        finish_reason: outcome.finish_reason,
        trace_id: outcome.trace_id,
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::config::AppConfig;
    use crate::llm::factory::StaticClientFactory;
    use crate::llm::provider::{ModelClient, ModelReply};
    use crate::tools::builtin::health::Health;
    use crate::tools::{ToolDefinition, ToolRegistry};

    struct Scripted(Mutex<VecDeque<Result<ModelReply, AppError>>>);

    #[async_trait]
    impl ModelClient for Scripted {
        async fn call(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _model: &str,
            _max_tokens: u32,
        ) -> Result<ModelReply, AppError> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::Message("script exhausted".into())))
        }
    }

    fn state(script: Vec<Result<ModelReply, AppError>>) -> AppState {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Health::new(AppConfig::default())));
        let client = Arc::new(Scripted(Mutex::new(script.into())));
        AppState::new(AppConfig::default(), registry, Arc::new(StaticClientFactory(client)))
    }

    fn reply(v: serde_json::Value) -> Result<ModelReply, AppError> {
        Ok(serde_json::from_value(v).unwrap())
    }

    fn request() -> AgentChatRequest {
        serde_json::from_value(json!({"messages": [{"role": "user", "content": "check health"}]})).unwrap()
    }

    #[tokio::test]
    async fn chat_runs_tools_and_records_trace() {
        let state = state(vec![
            reply(json!({"choices": [{"message": {"role": "assistant", "tool_calls": [
                {"id": "c1", "type": "function", "function": {"name": "health", "arguments": "{}"}}
            ]}, "finish_reason": "tool_calls"}]})),
            reply(json!({"choices": [{"message": {"role": "assistant", "content": "All good."}, "finish_reason": "stop"}]})),
        ]);

        let Json(resp) = agent_chat(State(state.clone()), HeaderMap::new(), Json(request()))
            .await
            .unwrap();
        assert_eq!(resp.response, "All good.");
        assert_eq!(resp.iterations, 2);
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.finish_reason, "stop");

        let trace = state.traces.get_trace(resp.trace_id.as_deref().unwrap()).unwrap();
        assert_eq!(trace.status, Status::Success);
        assert_eq!(trace.request_metadata["model"], crate::config::DEFAULT_MODEL);
        assert_eq!(trace.request_metadata["first_message"], "check health");
        assert_eq!(state.traces.active_count(), 0);
    }

    #[tokio::test]
    async fn setup_failure_closes_trace_as_error() {
        let state = AppState::new(
            AppConfig::default(),
            ToolRegistry::new(),
            Arc::new(crate::llm::factory::DatabricksClientFactory::new(AppConfig::default())),
        );
        let err = agent_chat(State(state.clone()), HeaderMap::new(), Json(request()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let traces = state.traces.list_traces(10, 0);
        assert_eq!(traces[0].status, Status::Error);
        assert_eq!(state.traces.active_count(), 0);
    }

    #[tokio::test]
    async fn model_failure_marks_trace_error() {
        let state = state(vec![Err(AppError::ModelAuth { body: "nope".into() })]);
        let err = agent_chat(State(state.clone()), HeaderMap::new(), Json(request()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ModelAuth { .. }));

        let traces = state.traces.list_traces(10, 0);
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].status, Status::Error);
    }
}
