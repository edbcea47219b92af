use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::error::AppError;
use crate::tools::builtin::{as_str, as_u64};
use crate::tools::definition::{ToolDefinition, ToolOutput};
use crate::tools::executor::Tool;
use crate::tools::security::{validate_endpoint_url, validate_http_method};
use crate::trace::store::truncate;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_TIMEOUT_SECS: u64 = 120;
const PREVIEW_CHARS: usize = 500;

/// Probes an HTTP endpoint and reports status, headers and a body preview.
pub struct CallApiEndpoint {
    client: reqwest::Client,
}

impl CallApiEndpoint {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CallApiEndpoint {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "call_api_endpoint".to_string(),
            description: "Call an HTTP API endpoint to check its health and retrieve data.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "endpoint_url": { "type": "string", "description": "Full URL of the endpoint." },
                    "http_method": { "type": "string", "description": "GET, POST, PUT, PATCH, DELETE, HEAD or OPTIONS. Default GET." },
                    "headers": { "type": "string", "description": "Optional JSON object of request headers." },
                    "body": { "type": "string", "description": "Optional request body; sent as JSON when it parses as JSON." },
                    "timeout": { "type": "integer", "description": "Timeout in seconds (default 10)." }
                },
                "required": ["endpoint_url"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, AppError> {
        let endpoint_url = as_str(&args, "endpoint_url")
            .ok_or_else(|| AppError::Tool("Missing endpoint_url".to_string()))?;
        let method_name = as_str(&args, "http_method").unwrap_or_else(|| "GET".to_string());
        let timeout = as_u64(&args, "timeout")
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, MAX_TIMEOUT_SECS);

        let url = validate_endpoint_url(&endpoint_url)?;
        let method = validate_http_method(&method_name)?;

        let headers = match parse_headers(args.get("headers")) {
            Ok(h) => h,
            Err(msg) => return Ok(json!({ "success": false, "error": msg }).into()),
        };

        info!(method = %method, url = %url, "calling API endpoint");
        let mut request = self
            .client
            .request(method.clone(), url)
            .timeout(Duration::from_secs(timeout));
        for (k, v) in &headers {
            request = request.header(k.as_str(), v.as_str());
        }
        request = match args.get("body") {
            Some(Value::String(raw)) if !raw.is_empty() => match serde_json::from_str::<Value>(raw) {
                Ok(parsed) if parsed.is_object() || parsed.is_array() => request.json(&parsed),
                _ => request.body(raw.clone()),
            },
            Some(body @ (Value::Object(_) | Value::Array(_))) => request.json(body),
            _ => request,
        };

        let failure = |error: String| {
            json!({
                "success": false,
                "is_healthy": false,
                "error": error,
                "url": endpoint_url,
                "method": method.as_str()
            })
        };

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Ok(failure(format!("Request timed out after {timeout} seconds")).into())
            }
            Err(e) if e.is_connect() => {
                return Ok(failure("Connection error - could not reach the endpoint".to_string()).into())
            }
            Err(e) => return Ok(failure(format!("Error: {e}")).into()),
        };

        let status = response.status();
        let response_headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return Ok(failure(format!("Error reading response: {e}")).into()),
        };
        let text = String::from_utf8_lossy(&bytes).to_string();

        let (response_type, response_data, rendered) = match serde_json::from_slice::<Value>(&bytes) {
            Ok(v) => {
                let rendered = serde_json::to_string_pretty(&v).unwrap_or_else(|_| text.clone());
                ("json", v, rendered)
            }
            Err(_) => ("text", Value::String(text.clone()), text),
        };

        Ok(json!({
            "success": true,
            "status_code": status.as_u16(),
            "status_text": status.canonical_reason().unwrap_or_default(),
            "is_healthy": status.is_success(),
            "response_type": response_type,
            "response_data": response_data,
            "response_preview": truncate(&rendered, PREVIEW_CHARS),
            "response_size": bytes.len(),
            "headers": response_headers,
            "url": endpoint_url,
            "method": method.as_str()
        })
        .into())
    }
}

fn parse_headers(raw: Option<&Value>) -> Result<BTreeMap<String, String>, String> {
    let value = match raw {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(BTreeMap::new()),
        Some(Value::String(s)) => {
            serde_json::from_str::<Value>(s).map_err(|_| "Invalid JSON format for headers".to_string())?
        }
        Some(other) => other.clone(),
    };
    let Value::Object(map) = value else {
        return Err("Headers must be a JSON object".to_string());
    };
    Ok(map
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect())
}
