use axum::extract::{Path, Query, State};
use axum::Json;

use crate::error::AppError;
use crate::models::common::{TraceListQuery, TraceListResponse};
use crate::state::AppState;
use crate::trace::Trace;

/// `GET /api/traces/list`
pub async fn list_traces(
    State(state): State<AppState>,
    Query(query): Query<TraceListQuery>,
) -> Json<TraceListResponse> {
    let traces = state.traces.list_traces(query.limit, query.offset);
    Json(TraceListResponse {
        total: state.traces.len(),
        traces,
    })
}

/// `GET /api/traces/{id}`
pub async fn get_trace(State(state): State<AppState>, Path(trace_id): Path<String>) -> Result<Json<Trace>, AppError> {
    state
        .traces
        .get_trace(&trace_id)
        .map(Json)
        .ok_or(AppError::TraceNotFound(trace_id))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::AppConfig;
    use crate::llm::factory::DatabricksClientFactory;
    use crate::tools::ToolRegistry;

    fn state() -> AppState {
        AppState::new(
            AppConfig::default(),
            ToolRegistry::new(),
            Arc::new(DatabricksClientFactory::new(AppConfig::default())),
        )
    }

    #[tokio::test]
    async fn lists_newest_first_with_total() {
        let state = state();
        let first = state.traces.create_trace(json!({"n": 1}));
        let second = state.traces.create_trace(json!({"n": 2}));

        let Json(page) = list_traces(State(state.clone()), Query(TraceListQuery { limit: 1, offset: 0 })).await;
        assert_eq!(page.total, 2);
        assert_eq!(page.traces.len(), 1);
        assert_eq!(page.traces[0].request_id, second);

        let Json(page) = list_traces(State(state), Query(TraceListQuery { limit: 50, offset: 1 })).await;
        assert_eq!(page.traces[0].request_id, first);
    }

    #[tokio::test]
    async fn unknown_trace_is_404() {
        let err = get_trace(State(state()), Path("missing".into())).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }
}
