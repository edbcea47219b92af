use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Message(String),

    #[error("Trace {0} not found")]
    TraceNotFound(String),

    #[error("Model call failed: {body} (Authentication failed - check OAuth token)")]
    ModelAuth { body: String },

    #[error("Model call failed: {body} (Permission denied - check app scopes include \"all-apis\")")]
    ModelPermission { body: String },

    #[error("Model call failed: {body} (Model endpoint \"{model}\" not found)")]
    ModelNotFound { model: String, body: String },

    #[error("Model call failed: {status} {body}")]
    ModelHttp { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool error: {0}")]
    Tool(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::TraceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ModelAuth { .. } => StatusCode::UNAUTHORIZED,
            AppError::ModelPermission { .. } => StatusCode::FORBIDDEN,
            AppError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::ModelHttp { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures of the outbound model call, as opposed to local faults.
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            AppError::ModelAuth { .. }
                | AppError::ModelPermission { .. }
                | AppError::ModelNotFound { .. }
                | AppError::ModelHttp { .. }
        )
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::Message(value.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        AppError::Message(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Message(value.to_string())
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
