use serde::{Deserialize, Serialize};

use crate::tools::ToolDefinition;
use crate::trace::Trace;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for TraceListQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceListResponse {
    pub traces: Vec<Trace>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDefinition>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReloadResponse {
    pub message: String,
    pub count: usize,
    pub tools: Vec<String>,
}
