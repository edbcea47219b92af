use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::models::common::{ToolListResponse, ToolReloadResponse};
use crate::state::AppState;

/// `GET /api/agent/tools`
pub async fn list_tools(State(state): State<AppState>) -> Result<Json<ToolListResponse>, AppError> {
    let tools = state.catalog.load(false).await?;
    Ok(Json(ToolListResponse {
        count: tools.len(),
        tools: (*tools).clone(),
    }))
}

/// `POST /api/agent/tools/reload`
pub async fn reload_tools(State(state): State<AppState>) -> Result<Json<ToolReloadResponse>, AppError> {
    let tools = state.catalog.load(true).await?;
    Ok(Json(ToolReloadResponse {
        message: "Tools reloaded successfully".to_string(),
        count: tools.len(),
        tools: tools.iter().map(|t| t.name.clone()).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AppConfig;
    use crate::llm::factory::DatabricksClientFactory;
    use crate::tools::builtin::register_builtins;
    use crate::tools::ToolRegistry;

    #[tokio::test]
    async fn lists_and_reloads_builtins() {
        let config = AppConfig::default();
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, &config, reqwest::Client::new());
        let state = AppState::new(config.clone(), registry, Arc::new(DatabricksClientFactory::new(config)));

        let Json(listed) = list_tools(State(state.clone())).await.unwrap();
        assert_eq!(listed.count, 8);
        assert_eq!(listed.tools.len(), 8);

        let Json(reloaded) = reload_tools(State(state)).await.unwrap();
        assert_eq!(reloaded.count, 8);
        assert!(reloaded.tools.contains(&"execute_dbsql".to_string()));
        assert!(reloaded.tools.contains(&"check_api_registry".to_string()));
    }
}
