use std::net::SocketAddr;

use clap::Parser;

use crate::error::AppError;

pub const DEFAULT_MODEL: &str = "databricks-claude-sonnet-4";
pub const DEFAULT_REGISTRY_TABLE: &str = "main.default.api_registry";

/// Runtime configuration. Every field can come from a flag or from the
/// environment variable named next to it.
#[derive(Debug, Clone, Parser)]
#[command(name = "fm-agent", version, about = "Tool-calling chat agent over Databricks Foundation Models")]
pub struct AppConfig {
    /// Workspace URL, e.g. https://adb-123.azuredatabricks.net
    #[arg(long, env = "DATABRICKS_HOST")]
    pub databricks_host: Option<String>,

    /// Service credential used when the request carries no user token.
    #[arg(long, env = "DATABRICKS_TOKEN", hide_env_values = true)]
    pub databricks_token: Option<String>,

    #[arg(long, env = "DATABRICKS_SQL_WAREHOUSE_ID")]
    pub warehouse_id: Option<String>,

    /// Fully qualified `catalog.schema.table` holding registered APIs.
    #[arg(long, env = "API_REGISTRY_TABLE", default_value = DEFAULT_REGISTRY_TABLE)]
    pub registry_table: String,

    #[arg(long, env = "FM_AGENT_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    #[arg(long, env = "FM_AGENT_MAX_TRACES", default_value_t = 100)]
    pub max_traces: usize,

    #[arg(long, env = "FM_AGENT_MAX_ITERATIONS", default_value_t = 10)]
    pub max_iterations: usize,

    #[arg(long, env = "FM_AGENT_DEFAULT_MODEL", default_value = DEFAULT_MODEL)]
    pub default_model: String,

    #[arg(long, env = "FM_AGENT_MAX_TOKENS", default_value_t = 4096)]
    pub max_tokens: u32,

    #[arg(long, env = "FM_AGENT_MODEL_TIMEOUT_SECS", default_value_t = 120)]
    pub model_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            databricks_host: None,
            databricks_token: None,
            warehouse_id: None,
            registry_table: DEFAULT_REGISTRY_TABLE.to_string(),
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_traces: 100,
            max_iterations: 10,
            default_model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            model_timeout_secs: 120,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_traces == 0 {
            return Err(AppError::Config("max_traces must be at least 1".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(AppError::Config("max_iterations must be at least 1".to_string()));
        }
        let parts: Vec<&str> = self.registry_table.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(AppError::Config(format!(
                "registry_table must be catalog.schema.table, got '{}'",
                self.registry_table
            )));
        }
        Ok(())
    }

    pub fn databricks_configured(&self) -> bool {
        self.host().is_some()
    }

    /// Normalized workspace host, or `None` when unset or blank.
    pub fn host(&self) -> Option<String> {
        normalize_databricks_host(self.databricks_host.clone())
    }
}

pub fn normalize_databricks_host(host: Option<String>) -> Option<String> {
    let host = host?;
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };

    // Users sometimes paste a full serving-endpoint URL.
    match url::Url::parse(&with_scheme) {
        Ok(url) => {
            let origin = url.origin().ascii_serialization();
            if origin == "null" {
                Some(with_scheme.trim_end_matches('/').to_string())
            } else {
                Some(origin)
            }
        }
        Err(_) => Some(with_scheme.trim_end_matches('/').to_string()),
    }
}
