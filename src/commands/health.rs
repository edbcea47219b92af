use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{auth_mode, user_token};
use crate::state::AppState;

/// `GET /api/health`
pub async fn health(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let token = user_token(&headers);
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "auth_mode": auth_mode(token.as_deref()),
        "databricks_configured": state.config.databricks_configured(),
        "traces": {
            "stored": state.traces.len(),
            "active": state.traces.active_count(),
            "max": state.traces.max_traces()
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::USER_TOKEN_HEADER;
    use crate::config::AppConfig;
    use crate::llm::factory::DatabricksClientFactory;
    use crate::tools::ToolRegistry;

    #[tokio::test]
    async fn reports_auth_mode_from_header() {
        let state = AppState::new(
            AppConfig::default(),
            ToolRegistry::new(),
            Arc::new(DatabricksClientFactory::new(AppConfig::default())),
        );
        state.traces.create_trace(json!({}));

        let Json(v) = health(State(state.clone()), HeaderMap::new()).await;
        assert_eq!(v["auth_mode"], "service-principal");
        assert_eq!(v["traces"]["stored"], 1);
        assert_eq!(v["traces"]["active"], 1);

        let mut headers = HeaderMap::new();
        headers.insert(USER_TOKEN_HEADER, "user-tok".parse().unwrap());
        let Json(v) = health(State(state), headers).await;
        assert_eq!(v["auth_mode"], "on-behalf-of");
        assert_eq!(v["databricks_configured"], false);
    }
}
