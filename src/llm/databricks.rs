use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::auth::Credentials;
use crate::error::AppError;
use crate::llm::provider::{Message, ModelClient, ModelReply};
use crate::tools::definition::ToolDefinition;

/// Client for Databricks model serving endpoints
/// (`/serving-endpoints/{model}/invocations`).
#[derive(Clone)]
pub struct DatabricksModelClient {
    client: reqwest::Client,
    host: String,
}

impl DatabricksModelClient {
    pub fn new(credentials: &Credentials, timeout: Duration) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", credentials.token))
                .map_err(|e| AppError::Config(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Message(e.to_string()))?;

        Ok(Self {
            client,
            host: credentials.host.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/serving-endpoints/{}/invocations", self.host, model)
    }
}

#[async_trait]
impl ModelClient for DatabricksModelClient {
    async fn call(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        max_tokens: u32,
    ) -> Result<ModelReply, AppError> {
        let wire_messages = messages.iter().map(Message::to_wire).collect::<Vec<_>>();
        let mut body = serde_json::json!({
            "messages": wire_messages,
            "max_tokens": max_tokens
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::Value::Array(tools.iter().map(ToolDefinition::to_openai).collect());
        }

        info!(model, messages = messages.len(), tools = tools.len(), "calling model endpoint");
        for (i, msg) in messages.iter().enumerate() {
            debug!(
                index = i,
                role = ?msg.role,
                has_tool_calls = msg.tool_calls.is_some(),
                has_tool_call_id = msg.tool_call_id.is_some(),
                "outgoing message"
            );
        }

        let resp = self.client.post(self.endpoint(model)).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(model, status = status.as_u16(), "model call failed");
            return Err(classify_failure(status, model, text));
        }

        let parsed: ModelReply = resp.json().await?;
        Ok(parsed)
    }
}

fn classify_failure(status: StatusCode, model: &str, body: String) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED => AppError::ModelAuth { body },
        StatusCode::FORBIDDEN => AppError::ModelPermission { body },
        StatusCode::NOT_FOUND => AppError::ModelNotFound {
            model: model.to_string(),
            body,
        },
        other => AppError::ModelHttp {
            status: other.as_u16(),
            body,
        },
    }
}
