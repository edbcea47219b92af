use async_trait::async_trait;
use serde_json::{json, Value};

use crate::auth::AuthMode;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::tools::definition::{ToolDefinition, ToolOutput};
use crate::tools::executor::Tool;

/// Reports local service status without touching the network.
pub struct Health {
    config: AppConfig,
}

impl Health {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Tool for Health {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "health".to_string(),
            description: "Check the health of the agent service and its Databricks configuration.".to_string(),
            parameters: json!({ "type": "object", "properties": {}, "required": [] }),
        }
    }

    async fn call(&self, _args: Value) -> Result<ToolOutput, AppError> {
        Ok(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "databricks_configured": self.config.databricks_configured(),
            "auth_mode": AuthMode::ServicePrincipal,
            "default_warehouse_configured": self.config.warehouse_id.is_some()
        })
        .into())
    }
}
